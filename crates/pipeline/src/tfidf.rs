//! TF-IDF vectorization of movie overviews.
//!
//! ## Algorithm
//! 1. Tokenize: lowercase, split on non-alphanumeric characters, keep tokens
//!    of at least two characters, drop English stop words
//! 2. Terms are the unigrams plus (optionally) bigrams of adjacent tokens
//! 3. Vocabulary: terms whose document frequency is within
//!    `[min_df, max_df * n_docs]`, capped at `max_features` most frequent
//! 4. Weight = raw count x smoothed idf, `idf = ln((1 + n) / (1 + df)) + 1`
//! 5. Each document vector is L2-normalized
//!
//! The vocabulary is stored sorted, so columns (and therefore every
//! downstream artifact) are identical across runs on the same corpus.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfidfConfig {
    /// Drop terms found in fewer documents than this
    pub min_df: usize,
    /// Drop terms found in more than this fraction of documents
    pub max_df: f32,
    /// Keep at most this many terms
    pub max_features: usize,
    /// Include bigrams in addition to unigrams
    pub bigrams: bool,
    pub remove_stop_words: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_df: 0.8,
            max_features: 5000,
            bigrams: true,
            remove_stop_words: true,
        }
    }
}

/// Fitted TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    /// Sorted; a term's position is its column
    vocabulary: Vec<String>,
    /// Inverse document frequency per column
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and idf weights from a corpus.
    ///
    /// An empty corpus, or one where no term survives the document-frequency
    /// limits, yields an empty vocabulary and zero-width vectors.
    pub fn fit<S: AsRef<str>>(documents: &[S], config: TfidfConfig) -> Self {
        let n_docs = documents.len();
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = analyze(doc.as_ref(), &config);
            let mut seen: HashSet<&str> = HashSet::new();
            for term in &terms {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }

        let max_doc_count = config.max_df.clamp(0.0, 1.0) * n_docs as f32;
        let mut kept: Vec<(String, usize)> = term_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq[term];
                df >= config.min_df && df as f32 <= max_doc_count
            })
            .collect();

        // Most frequent first; alphabetical among equals so truncation is deterministic
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(config.max_features);

        let mut vocabulary: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();
        vocabulary.sort();

        let idf = vocabulary
            .iter()
            .map(|term| {
                let df = doc_freq[term] as f64;
                (((1.0 + n_docs as f64) / (1.0 + df)).ln() + 1.0) as f32
            })
            .collect();

        Self {
            config,
            vocabulary,
            idf,
        }
    }

    /// TF-IDF vector of one document, L2-normalized (all zeros if no known terms)
    pub fn transform(&self, document: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        if vector.is_empty() {
            return vector;
        }

        for term in analyze(document, &self.config) {
            if let Ok(col) = self.vocabulary.binary_search(&term) {
                vector[col] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Idf weight of a term, if it is in the vocabulary
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(|col| self.idf[col])
    }
}

/// Split text into lowercase tokens of two or more alphanumeric characters
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Tokens plus n-grams, after stop-word removal
fn analyze(text: &str, config: &TfidfConfig) -> Vec<String> {
    let tokens: Vec<String> = tokenize(text)
        .into_iter()
        .filter(|t| !config.remove_stop_words || !is_stop_word(t))
        .collect();

    let mut terms = tokens.clone();
    if config.bigrams {
        terms.extend(tokens.windows(2).map(|pair| pair.join(" ")));
    }
    terms
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

/// Common English function words
const ENGLISH_STOP_WORDS: &[&str] = &[
    // articles and determiners
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "either",
    "neither", "some", "any", "all", "both", "few", "more", "most", "much", "many",
    "other", "another", "such", "no", "nor", "not", "only", "own", "same", "than",
    // pronouns
    "i", "me", "my", "myself", "we", "us", "our", "ours", "ourselves", "you", "your",
    "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she", "her",
    "hers", "herself", "it", "its", "itself", "they", "them", "their", "theirs",
    "themselves", "one", "someone", "something", "anyone", "anything", "everyone",
    "everything", "nobody", "nothing",
    // questions
    "what", "which", "who", "whom", "whose", "why", "when", "where", "how",
    // prepositions
    "about", "above", "across", "after", "against", "along", "among", "around", "at",
    "before", "behind", "below", "beneath", "beside", "besides", "between", "beyond",
    "by", "down", "during", "for", "from", "in", "inside", "into", "near", "of", "off",
    "on", "onto", "out", "outside", "over", "per", "through", "throughout", "to",
    "toward", "towards", "under", "underneath", "until", "up", "upon", "via", "with",
    "within", "without",
    // conjunctions
    "and", "as", "because", "but", "if", "or", "since", "so", "though", "although",
    "unless", "whether", "while", "whereas", "yet", "then", "once",
    // auxiliaries and common verbs
    "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "done", "will", "would", "shall", "should",
    "can", "could", "may", "might", "must", "get", "gets", "got",
    // adverbs
    "again", "also", "already", "almost", "always", "else", "even", "ever", "here",
    "there", "now", "often", "very", "too", "just", "still", "never", "perhaps",
    "quite", "rather", "soon", "together", "well", "however", "therefore", "thus",
    "ll", "re", "ve",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_df: usize, max_df: f32, bigrams: bool) -> TfidfConfig {
        TfidfConfig {
            min_df,
            max_df,
            bigrams,
            ..TfidfConfig::default()
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("A hero's journey, through SPACE-time!"),
            vec!["hero", "journey", "through", "space", "time"]
        );
    }

    #[test]
    fn test_stop_words_removed_before_bigrams() {
        let terms = analyze("the crew of the ship", &config(1, 1.0, true));
        assert_eq!(terms, vec!["crew", "ship", "crew ship"]);
    }

    #[test]
    fn test_vocabulary_respects_document_frequency() {
        let docs = [
            "space crew wormhole",
            "space crew heist",
            "space dream heist",
            "space farm drought",
        ];
        let v = TfidfVectorizer::fit(&docs, config(2, 0.8, false));
        // "space" is in every document (> 80%), singletons fall below min_df
        assert_eq!(v.vocabulary(), &["crew".to_string(), "heist".to_string()]);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let docs = ["alpha alpha beta", "alpha gamma", "beta gamma delta"];
        let v = TfidfVectorizer::fit(
            &docs,
            TfidfConfig {
                max_features: 2,
                ..config(1, 1.0, false)
            },
        );
        // alpha=3, beta=2, gamma=2: tie broken alphabetically
        assert_eq!(v.vocabulary(), &["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_smoothed_idf() {
        let docs = ["rare word", "word", "word"];
        let v = TfidfVectorizer::fit(&docs, config(1, 1.0, false));
        let expected_rare = ((4.0f32 / 2.0).ln()) + 1.0;
        let expected_common = ((4.0f32 / 4.0).ln()) + 1.0;
        assert!((v.idf("rare").unwrap() - expected_rare).abs() < 1e-6);
        assert!((v.idf("word").unwrap() - expected_common).abs() < 1e-6);
        assert_eq!(v.idf("missing"), None);
    }

    #[test]
    fn test_transform_is_unit_length() {
        let docs = ["astronaut wormhole farm", "wormhole heist dream", "farm dream"];
        let v = TfidfVectorizer::fit(&docs, config(1, 1.0, true));
        let vector = v.transform(docs[0]);
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(vector.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_unknown_and_empty_documents() {
        let docs = ["wormhole", "wormhole"];
        let v = TfidfVectorizer::fit(&docs, config(1, 1.0, false));
        assert_eq!(v.transform(""), vec![0.0]);
        assert_eq!(v.transform("nothing known"), vec![0.0]);

        let empty = TfidfVectorizer::fit(&["", ""], TfidfConfig::default());
        assert_eq!(empty.vocabulary_size(), 0);
        assert!(empty.transform("anything").is_empty());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let docs = ["a long voyage home", "the voyage of the crew", "home and crew"];
        let a = TfidfVectorizer::fit(&docs, config(1, 1.0, true));
        let b = TfidfVectorizer::fit(&docs, config(1, 1.0, true));
        assert_eq!(a, b);
    }
}
