use serde::Serialize;

/// A retrieved article as shown to the model and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// First `max_chars` characters of `text` with newlines replaced by spaces.
pub fn make_snippet(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

/// Strip leading `*`/space padding some scrapers leave on links.
pub fn clean_url(url: &str) -> String {
    url.trim_start_matches(['*', ' ']).trim().to_string()
}

/// Hits with a non-empty url, in retrieval order.
pub fn collect_sources(hits: &[QueryHit]) -> Vec<Source> {
    hits.iter()
        .filter(|hit| !hit.url.is_empty())
        .map(|hit| Source {
            title: hit.title.clone(),
            url: clean_url(&hit.url),
        })
        .collect()
}

pub fn build_prompt(question: &str, hits: &[QueryHit], top_k: usize) -> String {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "Article {}:\nTitle: {}\nURL: {}\nSnippet: {}",
                i + 1,
                hit.title,
                hit.url,
                hit.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful news assistant.\n\
         You will be given up to {top_k} retrieved news articles. \
         For each article, write 2-3 sentences summarizing the key point.\n\
         After summarizing each article, \
         write a short 'Final Note' synthesizing across all articles.\n\
         At the end, include a 'Sources:' section listing the article URLs.\n\
         \n\
         Here are the articles:\n\
         {context}\n\
         \n\
         Question: {question}\n"
    )
}

/// Model summary followed by a locally built "Sources:" block.
pub fn format_answer(summary: &str, sources: &[Source]) -> String {
    let lines = sources
        .iter()
        .map(|source| format!("{} - {}", source.title, source.url))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\nSources:\n{}", summary, lines)
}
