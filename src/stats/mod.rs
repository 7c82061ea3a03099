mod monthly;
mod summary;

pub use monthly::{DateRange, MonthBucket};
pub use summary::{difference_sentence, window_caption, DashboardStats};
