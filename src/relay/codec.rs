//! Shield payload wire format.
//!
//! The bridge program logs the shield intent as a single line:
//!
//! ```text
//! Program log: Shield:INC:<proxy>,<destination>,<asset>,<amount>
//! ```
//!
//! The payload is anchored at a fixed position. A line carrying the full
//! `Program log: Shield:INC:` header has everything after it as payload;
//! any other line must split on `:` into exactly three segments, the third
//! being the payload. A `:` inside the payload is malformed, so a crafted
//! destination can never shift which text is read as the proxy. The payload
//! is exactly four `,`-separated fields. Log text is attacker-influenced, so
//! every deviation is a typed rejection and no step indexes without a bounds
//! check.

use crate::relay::types::{Amount, RawLogBatch, Rejection, ShieldEvent};
use crate::relay::validator::PAYLOAD_LINE;

const SEGMENT_SEPARATOR: char = ':';
const FIELD_SEPARATOR: char = ',';
const SEGMENT_COUNT: usize = 3;
const FIELD_COUNT: usize = 4;

/// Header of the line the program emits, also written by `encode`.
pub const ENCODED_PREFIX: &str = "Program log: Shield:INC:";

#[derive(Debug, Clone)]
pub struct EventCodec {
    trusted_proxy: String,
}

impl EventCodec {
    pub fn new(trusted_proxy: impl Into<String>) -> Self {
        Self {
            trusted_proxy: trusted_proxy.into(),
        }
    }

    /// Decode the payload line of a batch that passed validation.
    pub fn decode(&self, batch: &RawLogBatch) -> Result<ShieldEvent, Rejection> {
        let line = batch.lines.get(PAYLOAD_LINE).ok_or_else(|| {
            Rejection::MalformedPayload(format!("no payload line at index {}", PAYLOAD_LINE))
        })?;
        self.decode_line(line)
    }

    /// Decode a single payload line.
    pub fn decode_line(&self, line: &str) -> Result<ShieldEvent, Rejection> {
        let payload = payload_of(line)?;
        let fields: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
        let &[proxy, destination, asset, amount] = &fields[..] else {
            return Err(Rejection::MalformedPayload(format!(
                "expected {} fields, got {}",
                FIELD_COUNT,
                fields.len()
            )));
        };

        if proxy.is_empty() {
            return Err(Rejection::MalformedPayload("empty proxy address".to_string()));
        }
        if destination.is_empty() {
            return Err(Rejection::MalformedPayload(
                "empty destination address".to_string(),
            ));
        }

        if proxy != self.trusted_proxy {
            return Err(Rejection::TrustViolation {
                found: proxy.to_string(),
            });
        }

        let amount = Amount::parse(amount);
        if amount.value.is_none() {
            tracing::warn!(
                amount = %amount.raw,
                "Shield amount is not an unsigned integer; forwarding raw text"
            );
        }

        Ok(ShieldEvent {
            proxy_address: proxy.to_string(),
            destination_address: destination.to_string(),
            asset_id: asset.to_string(),
            amount,
        })
    }

    /// Encode an event as the payload line the program emits.
    pub fn encode(event: &ShieldEvent) -> String {
        format!(
            "{}{},{},{},{}",
            ENCODED_PREFIX,
            event.proxy_address,
            event.destination_address,
            event.asset_id,
            event.amount.raw
        )
    }
}

fn payload_of(line: &str) -> Result<&str, Rejection> {
    let payload = match line.strip_prefix(ENCODED_PREFIX) {
        Some(rest) => rest,
        None => {
            let segments: Vec<&str> = line.split(SEGMENT_SEPARATOR).collect();
            let &[_, _, payload] = &segments[..] else {
                return Err(Rejection::MalformedPayload(format!(
                    "expected {} ':' segments, got {}",
                    SEGMENT_COUNT,
                    segments.len()
                )));
            };
            payload
        }
    };
    if payload.contains(SEGMENT_SEPARATOR) {
        return Err(Rejection::MalformedPayload(
            "':' inside payload".to_string(),
        ));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::validator::tests::{batch, shield_lines};

    const SCENARIO_LINE: &str = "Program log: Shield:INC:P,DEST123,TOKEN1,100000";

    #[test]
    fn test_decode_scenario() {
        let event = EventCodec::new("P")
            .decode(&batch(shield_lines(SCENARIO_LINE)))
            .unwrap();
        assert_eq!(event.proxy_address(), "P");
        assert_eq!(event.destination_address(), "DEST123");
        assert_eq!(event.asset_id(), "TOKEN1");
        assert_eq!(event.amount().value, Some(100_000));
        assert_eq!(event.amount().raw, "100000");
    }

    #[test]
    fn test_decode_three_segment_form() {
        let err = EventCodec::new("P")
            .decode_line("Program log: P,DEST,TOKEN,7")
            .unwrap_err();
        // Two segments only.
        assert!(matches!(err, Rejection::MalformedPayload(_)));

        let event = EventCodec::new("P")
            .decode_line("Program log: Shield:P,DEST,TOKEN,7")
            .unwrap();
        assert_eq!(event.destination_address(), "DEST");
    }

    #[test]
    fn test_colon_in_payload_cannot_hide_proxy() {
        let codec = EventCodec::new("P");
        let err = codec
            .decode_line("Program log: Shield:INC:Q,junk:P,FORGED,TOKEN1,100")
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::MalformedPayload("':' inside payload".to_string())
        );

        // Without the full header the extra segment is counted instead.
        let err = codec
            .decode_line("Program log: X:Q,junk:P,FORGED,TOKEN1,100")
            .unwrap_err();
        assert!(matches!(err, Rejection::MalformedPayload(_)));
    }

    #[test]
    fn test_untrusted_proxy() {
        let err = EventCodec::new("Q").decode_line(SCENARIO_LINE).unwrap_err();
        assert_eq!(err, Rejection::TrustViolation { found: "P".to_string() });
    }

    #[test]
    fn test_proxy_match_is_exact() {
        let codec = EventCodec::new("P");
        assert!(codec.decode_line("Program log: Shield:INC: P,D,T,1").is_err());
        assert!(codec.decode_line("Program log: Shield:INC:p,D,T,1").is_err());
    }

    #[test]
    fn test_too_few_fields() {
        let err = EventCodec::new("P")
            .decode_line("Program log: Shield:INC:P,DEST123")
            .unwrap_err();
        assert!(matches!(err, Rejection::MalformedPayload(_)));
    }

    #[test]
    fn test_too_many_fields() {
        let err = EventCodec::new("P")
            .decode_line("Program log: Shield:INC:P,D,T,1,extra")
            .unwrap_err();
        assert!(matches!(err, Rejection::MalformedPayload(_)));
    }

    #[test]
    fn test_empty_destination() {
        let err = EventCodec::new("P")
            .decode_line("Program log: Shield:INC:P,,T,1")
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::MalformedPayload("empty destination address".to_string())
        );
    }

    #[test]
    fn test_unparseable_amount_is_forwarded() {
        let event = EventCodec::new("P")
            .decode_line("Program log: Shield:INC:P,D,T,12abc")
            .unwrap();
        assert_eq!(event.amount().raw, "12abc");
        assert_eq!(event.amount().value, None);
    }

    #[test]
    fn test_missing_payload_line() {
        let mut lines = shield_lines(SCENARIO_LINE);
        lines.truncate(3);
        let err = EventCodec::new("P").decode(&batch(lines)).unwrap_err();
        assert!(matches!(err, Rejection::MalformedPayload(_)));
    }

    #[test]
    fn test_hostile_lines_never_panic() {
        let codec = EventCodec::new("P");
        let inputs = [
            "",
            ":",
            "::",
            ":::",
            ",,,",
            "::,,,",
            "a:b:",
            "a:b:,",
            "\u{0}:\u{0}:\u{0},\u{0},\u{0},\u{0}",
            "Program log: Shield:INC:P,D,T,99999999999999999999999",
        ];
        for input in inputs {
            let _ = codec.decode_line(input);
        }
        let huge = format!("a:b:{}", "P,".repeat(10_000));
        assert!(codec.decode_line(&huge).is_err());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let codec = EventCodec::new("8WUP1RGTDTZGYBjkHQfjnwMbnnk25hnE6Du7vFpaq1QK");
        let event = ShieldEvent {
            proxy_address: "8WUP1RGTDTZGYBjkHQfjnwMbnnk25hnE6Du7vFpaq1QK".to_string(),
            destination_address: "12shR6fDe7ZcprYn6rjLwiLcL7oJRiek66ozzYu3B3rBxYXk".to_string(),
            asset_id: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".to_string(),
            amount: Amount::from(100_000u64),
        };
        let line = EventCodec::encode(&event);
        assert!(line.starts_with(ENCODED_PREFIX));
        assert_eq!(codec.decode_line(&line).unwrap(), event);
    }
}
