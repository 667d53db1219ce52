//! Batch - Accumulator output
//!
//! A sequenced group of encoded flows handed to the batch sinks.

use crate::EncodedFlow;

/// A completed group of encoded flows
///
/// Immutable after the Accumulator hands it off; sinks share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Sequence number used to name the batch's output object
    pub sequence: usize,

    /// Flows in channel-delivery order
    pub flows: Vec<EncodedFlow>,
}

impl Batch {
    pub fn new(sequence: usize, flows: Vec<EncodedFlow>) -> Self {
        Self { sequence, flows }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Object name for this batch: `<sequence>flow.json`
    pub fn file_name(&self) -> String {
        format!("{}flow.json", self.sequence)
    }

    /// Render the batch as a JSON array
    ///
    /// Every flow is followed by a comma and the array is closed by an empty
    /// object, so the output stays valid JSON without last-element detection.
    pub fn to_json_array(&self) -> String {
        let capacity = self.flows.iter().map(|f| f.len() + 1).sum::<usize>() + 4;
        let mut out = String::with_capacity(capacity);
        out.push('[');
        for flow in &self.flows {
            out.push_str(flow.as_str());
            out.push(',');
        }
        out.push_str("{}]");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_renders_sentinel_only() {
        let batch = Batch::new(1, Vec::new());
        assert_eq!(batch.to_json_array(), "[{}]");
    }

    #[test]
    fn test_render_is_valid_json() {
        let flows = vec![
            EncodedFlow::from(r#"{"Header":{"Count":0},"Records":[]}"#),
            EncodedFlow::from(r#"{"Header":{"Count":1},"Records":[{}]}"#),
        ];
        let batch = Batch::new(7, flows);

        let value: serde_json::Value = serde_json::from_str(&batch.to_json_array()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[1]["Header"]["Count"], 1);
        assert!(array[2].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(Batch::new(42, Vec::new()).file_name(), "42flow.json");
    }
}
