pub mod anonymize;
mod checksum;
pub mod dates;
pub mod legal;
pub mod pii;
mod recognizer;

pub use anonymize::{anonymize, ANONYMIZER_OPERATORS, AnonymizedItem, AnonymizedText, HashType, Operator, OperatorConfig};
pub use dates::{extract_dates, DateFormat, DateRecognizer, ExtractedDate};
pub use legal::{LegalEntityRecognizer, LegalServiceInfo};
pub use pii::{is_sensitive, AnalyzeOptions, PiiAnalyzer, DEFAULT_PII_ENTITIES, SENSITIVE_PII_ENTITIES};
pub use recognizer::{PatternRecognizer, Recognizer, RecognizerRegistry, RecognizerResult};
