//! Structural checks on a raw log batch. Never decodes.

use crate::relay::types::{RawLogBatch, Rejection};

/// Literal the bridge program logs for the shield instruction.
pub const SHIELD_INSTRUCTION_TAG: &str = "Instruction: Shield";

/// Index of the instruction-tag line.
pub const INSTRUCTION_LINE: usize = 1;

/// Index of the payload line.
pub const PAYLOAD_LINE: usize = 6;

/// Minimum lines a shield batch can have.
pub const MIN_LOG_LINES: usize = PAYLOAD_LINE + 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogValidator;

impl LogValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, batch: &RawLogBatch) -> Result<(), Rejection> {
        if batch.failed {
            return Err(Rejection::ChainFailure(
                batch
                    .error
                    .clone()
                    .unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }

        if batch.lines.len() < MIN_LOG_LINES {
            return Err(Rejection::TooFewLines {
                found: batch.lines.len(),
            });
        }

        let tag_line = &batch.lines[INSTRUCTION_LINE];
        if !tag_line.contains(SHIELD_INSTRUCTION_TAG) {
            return Err(Rejection::NotShieldInstruction {
                line: tag_line.clone(),
            });
        }

        Ok(())
    }
}
