/*!
 * Subtitle segmentation and alignment.
 *
 * This module provides:
 * - Chunk planning over recognized words (`chunking`)
 * - Prompting and retrying the LLM split (`prompts`, `orchestrator`)
 * - Tolerant parsing of the returned segments (`parser`, `integrity`)
 * - Fuzzy alignment of segments to word timings (`fuzzy`, `aligner`)
 * - Timestamp repair and the rule-based fallback (`timestamps`, `fallback`)
 */

pub mod aligner;
pub mod chunking;
pub mod fallback;
pub mod fuzzy;
pub mod integrity;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod timestamps;

// Re-export main types
pub use aligner::{AlignedSegment, Aligner, AlignmentConfig, AlignmentResult, AlignmentRun};
pub use chunking::{Chunk, ChunkPlan, ChunkPlanner};
pub use fallback::{FallbackConfig, FallbackSegmenter};
pub use integrity::{check_integrity, IntegrityReport};
pub use orchestrator::RewriteOrchestrator;
pub use parser::Segment;
pub use prompts::{SplitMode, SplitPromptBuilder};
pub use timestamps::{TimestampConfig, TimestampIssue, TimestampReport, TimestampValidator};
