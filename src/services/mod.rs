mod fetcher;
mod readwise;

pub use fetcher::{DocumentFetcher, ListFilter, ListTransport, Pause, TokioPause};
#[cfg(test)]
pub use fetcher::{ListPage, ListQuery};
pub use readwise::ReadwiseClient;
