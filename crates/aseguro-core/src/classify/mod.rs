//! Nearest-neighbour classifiers over cached reference embeddings
//!
//! Two instances share the same best-match classifier:
//! - the security filter (threat corpus, threshold 0.82)
//! - the chitchat router (intent examples, threshold 0.85)

mod chitchat;
mod corpus;
mod replies;
mod security;
mod similarity;

pub use chitchat::{ChitchatRouter, CHITCHAT_CORPUS_ID, DEFAULT_CHITCHAT_THRESHOLD};
pub use corpus::{ChitchatCorpus, Intent, ReferencePhrase, SecurityCorpus, THREAT_LABEL};
pub use replies::ReplyPicker;
pub use security::{
    BlockReason, SecurityFilter, SecurityVerdict, SemanticVerdict, DEFAULT_SECURITY_THRESHOLD,
    SECURITY_CORPUS_ID,
};
pub use similarity::{classify, cosine_similarity, ClassificationResult, NearestNeighborClassifier};
