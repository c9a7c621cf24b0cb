//! Per-batch processing: validation, decoding and rejection reporting.
//!
//! Trust violations are logged at error level with `alert = "trust_violation"`;
//! chain failures and shape rejections are routine and stay below that.

use crate::observability::metrics;
use crate::relay::codec::EventCodec;
use crate::relay::types::{RawLogBatch, Rejection, ShieldEvent};
use crate::relay::validator::LogValidator;
use tracing::{error, info, warn};

/// Validate then decode. The codec never sees a batch the validator rejected.
#[derive(Debug, Clone)]
pub struct ShieldProcessor {
    validator: LogValidator,
    codec: EventCodec,
}

impl ShieldProcessor {
    pub fn new(trusted_proxy: impl Into<String>) -> Self {
        Self {
            validator: LogValidator::new(),
            codec: EventCodec::new(trusted_proxy),
        }
    }

    pub fn process(&self, batch: &RawLogBatch) -> Result<ShieldEvent, Rejection> {
        self.validator.validate(batch)?;
        self.codec.decode(batch)
    }
}

/// Log and count a rejected batch.
pub fn report_rejection(batch: &RawLogBatch, rejection: &Rejection) {
    metrics::record_batch(rejection.kind());
    match rejection {
        Rejection::TrustViolation { found } => {
            error!(
                signature = %batch.transaction_id,
                slot = batch.slot,
                proxy = %found,
                alert = "trust_violation",
                "Shield log names an untrusted proxy; possible spoofing"
            );
        }
        Rejection::ChainFailure(err) => {
            info!(signature = %batch.transaction_id, error = %err, "Transaction failed on chain, skipping");
        }
        Rejection::MalformedPayload(_) => {
            warn!(signature = %batch.transaction_id, slot = batch.slot, reason = %rejection, "Malformed shield payload");
        }
        Rejection::TooFewLines { .. } | Rejection::NotShieldInstruction { .. } => {
            // Other bridge instructions land here routinely.
            tracing::debug!(signature = %batch.transaction_id, reason = %rejection, "Batch is not a shield event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::validator::tests::{batch, shield_lines};

    const LINE: &str = "Program log: Shield:INC:P,DEST123,TOKEN1,100000";

    #[test]
    fn test_process_valid() {
        let event = ShieldProcessor::new("P").process(&batch(shield_lines(LINE))).unwrap();
        assert_eq!(event.destination_address(), "DEST123");
    }

    #[test]
    fn test_failed_batch_never_decoded() {
        // A payload that would be a trust violation if decoded.
        let mut b = batch(shield_lines(LINE));
        b.failed = true;
        let err = ShieldProcessor::new("Q").process(&b).unwrap_err();
        assert!(matches!(err, Rejection::ChainFailure(_)));
    }

    #[test]
    fn test_short_batch_never_decoded() {
        let mut lines = shield_lines(LINE);
        lines.truncate(6);
        let err = ShieldProcessor::new("Q").process(&batch(lines)).unwrap_err();
        assert_eq!(err, Rejection::TooFewLines { found: 6 });
    }

    #[test]
    fn test_trust_violation() {
        let err = ShieldProcessor::new("Q").process(&batch(shield_lines(LINE))).unwrap_err();
        assert_eq!(err.kind(), "trust_violation");
        report_rejection(&batch(shield_lines(LINE)), &err);
    }
}
