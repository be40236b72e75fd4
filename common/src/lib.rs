//! PhoenixR1 Common Library
//!
//! ファームウェア解決と書き込みシーケンスの純粋なロジック（UI・プロセス起動なし）

pub mod error;
pub mod partition;
pub mod probe;
pub mod record;
pub mod resolver;
pub mod restore;
pub mod roots;
pub mod sequence;
pub mod vocabulary;

pub use error::{Error, Result};
pub use partition::{NamePatterns, NameTable, PartitionKey};
pub use probe::{match_device_text, DEVICE_KEYWORDS};
pub use record::{classify, LogLevel, LogRecord};
pub use resolver::{resolve, FirmwareMapping, MatchStrength, ResolvedImage, MAX_SEARCH_DEPTH};
pub use restore::{FailurePolicy, RestoreError, RestoreMachine, RestoreState};
pub use roots::{SearchRoots, FIRMWARE_SUBDIR};
pub use sequence::{build_sequence, is_ready, FlashOperation, FlashSequence, SequenceOptions, Step, FLASH_ORDER};
pub use vocabulary::ToolVocabulary;
