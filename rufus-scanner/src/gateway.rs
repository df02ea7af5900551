use crate::error::OracleError;
use crate::oracle::{Oracle, Prompt, Task};
use crate::page::{LinkCandidate, truncate_chars};
use async_trait::async_trait;
use tracing::{info, warn};

/// Characters of page text submitted for relevance classification
pub const PAGE_TEXT_LIMIT: usize = 2000;

/// Characters of parent-element text submitted as link context
pub const LINK_CONTEXT_LIMIT: usize = 200;

/// The three relevance decisions a crawl needs.
///
/// Implementations never fail: an unanswerable question yields an empty
/// keyword set or `false`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn expand_keywords(&self, instruction: &str) -> Vec<String>;

    async fn classify_page_relevance(
        &self,
        text: &str,
        instruction: &str,
        keywords: &[String],
    ) -> bool;

    async fn classify_link_follow(
        &self,
        link: &LinkCandidate,
        instruction: &str,
        keywords: &[String],
    ) -> bool;
}

/// Builds prompts for an [`Oracle`] and parses its answers, failing closed.
pub struct ClassificationGateway<O: Oracle> {
    oracle: O,
}

impl<O: Oracle> ClassificationGateway<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    async fn ask_verdict(&self, prompt: Prompt, subject: &str) -> bool {
        let task = prompt.task;
        let result = self
            .oracle
            .complete(&prompt)
            .await
            .and_then(|answer| parse_verdict(&answer));

        match result {
            Ok(verdict) => {
                info!(operation = task.as_str(), subject = %subject, verdict, "Classified");
                verdict
            }
            Err(e) => {
                warn!(
                    operation = task.as_str(),
                    subject = %subject,
                    error = %e,
                    "Classification failed, treating as not relevant"
                );
                false
            }
        }
    }
}

#[async_trait]
impl<O: Oracle> Classifier for ClassificationGateway<O> {
    async fn expand_keywords(&self, instruction: &str) -> Vec<String> {
        let prompt = keyword_prompt(instruction);
        let result = self
            .oracle
            .complete(&prompt)
            .await
            .and_then(|answer| parse_keywords(&answer));

        match result {
            Ok(keywords) => {
                info!(operation = Task::ExpandKeywords.as_str(), ?keywords, "Generated keywords");
                keywords
            }
            Err(e) => {
                warn!(
                    operation = Task::ExpandKeywords.as_str(),
                    error = %e,
                    "Keyword expansion failed, continuing without keywords"
                );
                Vec::new()
            }
        }
    }

    async fn classify_page_relevance(
        &self,
        text: &str,
        instruction: &str,
        keywords: &[String],
    ) -> bool {
        let excerpt = truncate_chars(text, PAGE_TEXT_LIMIT);
        self.ask_verdict(relevance_prompt(excerpt, instruction, keywords), "page content")
            .await
    }

    async fn classify_link_follow(
        &self,
        link: &LinkCandidate,
        instruction: &str,
        keywords: &[String],
    ) -> bool {
        self.ask_verdict(link_prompt(link, instruction, keywords), &link.url)
            .await
    }
}

pub fn keyword_prompt(instruction: &str) -> Prompt {
    Prompt {
        task: Task::ExpandKeywords,
        system: "You are a semantic analysis expert. Return only a comma-separated list of keywords."
            .to_string(),
        user: format!(
            "Generate semantically related keywords and phrases for this instruction:\n\n\
             Instruction: \"{instruction}\"\n\n\
             Consider:\n\
             1. Direct synonyms and related terms\n\
             2. Industry-specific terminology\n\
             3. Common abbreviations\n\
             4. Related concepts and topics\n\
             5. Contextual variations\n\n\
             Return ONLY a comma-separated list of keywords, no explanations."
        ),
    }
}

pub fn relevance_prompt(excerpt: &str, instruction: &str, keywords: &[String]) -> Prompt {
    Prompt {
        task: Task::PageRelevance,
        system: "You are a content relevance analyst. Respond only with TRUE or FALSE.".to_string(),
        user: format!(
            "Analyze if this content is relevant to the instruction and keywords.\n\n\
             Instruction: \"{instruction}\"\n\
             Keywords: {keywords}\n\n\
             Content (excerpt):\n\"\"\"\n{excerpt}\n\"\"\"\n\n\
             Consider:\n\
             1. Direct keyword matches\n\
             2. Semantic relationship to instruction\n\
             3. Context and meaning\n\
             4. Content quality and depth\n\
             5. Information value\n\n\
             Answer ONLY with TRUE or FALSE.",
            keywords = keywords.join(", "),
        ),
    }
}

pub fn link_prompt(link: &LinkCandidate, instruction: &str, keywords: &[String]) -> Prompt {
    Prompt {
        task: Task::LinkFollow,
        system: "You are a link relevance analyst. Respond only with TRUE or FALSE.".to_string(),
        user: format!(
            "Should we follow this link based on the instruction and context?\n\n\
             Instruction: \"{instruction}\"\n\
             Keywords: {keywords}\n\n\
             Link Analysis:\n\
             - Link Text: \"{text}\"\n\
             - URL: {url}\n\
             - Surrounding Context: \"{context}\"\n\n\
             Consider:\n\
             1. Relevance to instruction\n\
             2. Keyword matches\n\
             3. URL structure/path\n\
             4. Link context\n\
             5. Potential information value\n\n\
             Answer ONLY with TRUE or FALSE.",
            keywords = keywords.join(", "),
            text = link.link_text,
            url = link.url,
            context = link.context,
        ),
    }
}

/// Accepts exactly `TRUE` or `FALSE`, ignoring case and surrounding whitespace.
pub fn parse_verdict(answer: &str) -> Result<bool, OracleError> {
    match answer.trim().to_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        other => Err(OracleError::Malformed(format!(
            "expected TRUE or FALSE, got {:?}",
            truncate_chars(other, 80)
        ))),
    }
}

/// Splits a comma-delimited list, trimming entries and dropping empty ones.
/// A list with no entries is malformed.
pub fn parse_keywords(answer: &str) -> Result<Vec<String>, OracleError> {
    let keywords: Vec<String> = answer
        .split(',')
        .map(|kw| kw.trim().to_string())
        .filter(|kw| !kw.is_empty())
        .collect();

    if keywords.is_empty() {
        return Err(OracleError::Malformed("empty keyword list".into()));
    }
    Ok(keywords)
}
