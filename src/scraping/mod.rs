//! News scraper: seed pages → candidate links → article pages → `Article`s.

mod article;
mod extract;
mod run;
mod source;

pub use article::{articles_path, load_articles, save_articles, Article};
pub use extract::{extract_hrefs, is_candidate, normalize_link, parse_article};
pub use run::Scraper;
pub use source::{HttpPageSource, PageSource};
