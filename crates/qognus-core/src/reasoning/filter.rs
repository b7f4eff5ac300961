//! Incremental separation of visible answer text from hidden reasoning.
//!
//! Local reasoning models interleave their chain of thought with the answer,
//! bounded by a literal marker pair (`<think>` ... `</think>` for qwen3).
//! Markers are plain text and arrive at arbitrary fragment boundaries, so the
//! filter keeps a small pending buffer holding any tail that could still grow
//! into a marker, and releases everything else as soon as it is classified.
//!
//! Guarantees for every fragmentation of the same input:
//! - nothing between a matched open/close pair is ever returned,
//! - no marker text, complete or partial, is ever returned,
//! - the concatenated output is identical (chunk invariance).

use tracing::{debug, warn};

use qognus_types::error::MarkerError;

/// The literal open/close marker strings that bound a hidden span.
///
/// Matching is case-sensitive with no normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    open: String,
    close: String,
}

impl MarkerPair {
    /// Create a marker pair. Both markers must be non-empty.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, MarkerError> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() {
            return Err(MarkerError::Empty { which: "open" });
        }
        if close.is_empty() {
            return Err(MarkerError::Empty { which: "close" });
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for MarkerPair {
    fn default() -> Self {
        Self {
            open: "<think>".to_string(),
            close: "</think>".to_string(),
        }
    }
}

/// Which kind of span the filter is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Visible,
    Hidden,
}

/// Streaming classifier for one assistant response.
///
/// Create one per turn, call [`feed`](Self::feed) for every fragment in
/// arrival order, then [`finish`](Self::finish) once at end-of-stream.
#[derive(Debug)]
pub struct ReasoningFilter {
    markers: MarkerPair,
    state: StreamState,
    /// Raw text not yet classified: a possible marker prefix, nothing more.
    pending: String,
    /// Bytes of reasoning (markers excluded) discarded so far.
    hidden_bytes: usize,
    finished: bool,
}

impl ReasoningFilter {
    pub fn new(markers: MarkerPair) -> Self {
        Self {
            markers,
            state: StreamState::Visible,
            pending: String::new(),
            hidden_bytes: 0,
            finished: false,
        }
    }

    /// Remove every hidden span from a complete response in one call.
    pub fn strip(markers: &MarkerPair, text: &str) -> String {
        let mut filter = Self::new(markers.clone());
        let mut visible = filter.feed(text);
        visible.push_str(&filter.finish());
        visible
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn markers(&self) -> &MarkerPair {
        &self.markers
    }

    /// Bytes of hidden reasoning dropped so far.
    pub fn hidden_bytes(&self) -> usize {
        self.hidden_bytes
    }

    /// Length of the text currently withheld as a possible marker prefix.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consume one fragment and return the visible text that is now safe to
    /// display. Returns an empty string when nothing new can be released.
    pub fn feed(&mut self, fragment: &str) -> String {
        if self.finished {
            warn!(
                fragment_len = fragment.len(),
                "fragment fed after finish; ignoring"
            );
            return String::new();
        }
        if fragment.is_empty() {
            return String::new();
        }

        self.pending.push_str(fragment);
        let mut emitted = String::new();

        loop {
            match self.state {
                StreamState::Visible => {
                    if let Some(pos) = self.pending.find(self.markers.open()) {
                        emitted.push_str(&self.pending[..pos]);
                        self.pending
                            .replace_range(..pos + self.markers.open().len(), "");
                        self.state = StreamState::Hidden;
                        continue;
                    }
                    let keep = partial_marker_len(&self.pending, self.markers.open());
                    let safe = self.pending.len() - keep;
                    emitted.push_str(&self.pending[..safe]);
                    self.pending.replace_range(..safe, "");
                    break;
                }
                StreamState::Hidden => {
                    if let Some(pos) = self.pending.find(self.markers.close()) {
                        self.hidden_bytes += pos;
                        self.pending
                            .replace_range(..pos + self.markers.close().len(), "");
                        self.state = StreamState::Visible;
                        continue;
                    }
                    let keep = partial_marker_len(&self.pending, self.markers.close());
                    let discard = self.pending.len() - keep;
                    self.hidden_bytes += discard;
                    self.pending.replace_range(..discard, "");
                    break;
                }
            }
        }

        emitted
    }

    /// Signal end-of-stream and return any withheld visible text.
    ///
    /// In `Hidden` state the remaining buffer belongs to an unterminated
    /// reasoning span and is dropped. Further calls return an empty string.
    pub fn finish(&mut self) -> String {
        if self.finished {
            return String::new();
        }
        self.finished = true;

        let residual = std::mem::take(&mut self.pending);
        match self.state {
            StreamState::Visible => {
                debug!(hidden_bytes = self.hidden_bytes, "reasoning filter finished");
                residual
            }
            StreamState::Hidden => {
                self.hidden_bytes += residual.len();
                debug!(
                    hidden_bytes = self.hidden_bytes,
                    "reasoning filter finished inside an unterminated hidden span"
                );
                String::new()
            }
        }
    }
}

/// Length of the longest suffix of `buffer` that is a proper prefix of
/// `marker`, measured in bytes and cut on a char boundary.
fn partial_marker_len(buffer: &str, marker: &str) -> usize {
    let max = buffer.len().min(marker.len().saturating_sub(1));
    (1..=max)
        .rev()
        .find(|&k| {
            let start = buffer.len() - k;
            buffer.is_char_boundary(start) && marker.starts_with(&buffer[start..])
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn think() -> MarkerPair {
        MarkerPair::default()
    }

    /// Feed `chunks` in order and collect every non-final output, then the
    /// output of `finish`.
    fn run(markers: &MarkerPair, chunks: &[&str]) -> (Vec<String>, String) {
        let mut filter = ReasoningFilter::new(markers.clone());
        let outputs = chunks.iter().map(|c| filter.feed(c)).collect();
        let tail = filter.finish();
        (outputs, tail)
    }

    fn run_joined(markers: &MarkerPair, chunks: &[&str]) -> String {
        let (outputs, tail) = run(markers, chunks);
        let mut joined = outputs.concat();
        joined.push_str(&tail);
        joined
    }

    /// Whole-string reference: leftmost open, then leftmost close after it.
    fn reference_strip(text: &str, markers: &MarkerPair) -> String {
        let mut out = String::new();
        let mut rest = text;
        loop {
            match rest.find(markers.open()) {
                None => {
                    out.push_str(rest);
                    return out;
                }
                Some(p) => {
                    out.push_str(&rest[..p]);
                    rest = &rest[p + markers.open().len()..];
                    match rest.find(markers.close()) {
                        None => return out,
                        Some(q) => rest = &rest[q + markers.close().len()..],
                    }
                }
            }
        }
    }

    fn char_boundaries(text: &str) -> Vec<usize> {
        text.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect()
    }

    const CORPUS: &[&str] = &[
        "Hello <think>secret reasoning</think> world",
        "A<think>x</think>B<think>y</think>C",
        "<think>all hidden</think>",
        "<think></think>",
        "no markers here, just < and <th and </think",
        "before<think>after",
        "a <thin b <think>c</thin d</think> e",
        "<<think>>x</think>>",
        "tail <thi",
        "<think>unterminated </thin",
        "ticket cluster 7 <think>is it auth?</think>VaultShield auth anomalies.",
    ];

    #[test]
    fn marker_pair_rejects_empty_markers() {
        assert_eq!(
            MarkerPair::new("", "</think>").unwrap_err(),
            MarkerError::Empty { which: "open" }
        );
        assert_eq!(
            MarkerPair::new("<think>", "").unwrap_err(),
            MarkerError::Empty { which: "close" }
        );
        let pair = MarkerPair::new("<r>", "</r>").unwrap();
        assert_eq!(pair.open(), "<r>");
        assert_eq!(pair.close(), "</r>");
    }

    #[test]
    fn split_open_marker_scenario() {
        let (outputs, tail) = run(
            &think(),
            &["Hello <th", "ink>secret reasoning</think> world", ""],
        );
        assert_eq!(outputs, vec!["Hello ", " world", ""]);
        assert_eq!(tail, "");
        assert_eq!(format!("{}{}", outputs.concat(), tail), "Hello  world");
    }

    #[test]
    fn plain_text_passes_through_in_five_chunks() {
        let chunks = ["Just", " a no", "rmal", " answer", "."];
        assert_eq!(run_joined(&think(), &chunks), "Just a normal answer.");
    }

    #[test]
    fn plain_text_is_released_without_delay() {
        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed("Cluster 3"), "Cluster 3");
        assert_eq!(filter.feed(" is noisy."), " is noisy.");
        assert_eq!(filter.pending_len(), 0);
        assert_eq!(filter.finish(), "");
    }

    #[test]
    fn two_sequential_hidden_spans() {
        assert_eq!(
            run_joined(&think(), &["A<think>x</think>B<think>y</think>C"]),
            "ABC"
        );
    }

    #[test]
    fn unterminated_hidden_span_yields_prefix_only() {
        assert_eq!(run_joined(&think(), &["before<think>after"]), "before");

        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed("before<think>af"), "before");
        assert_eq!(filter.feed("ter"), "");
        assert_eq!(filter.state(), StreamState::Hidden);
        assert_eq!(filter.finish(), "");
        assert_eq!(filter.hidden_bytes(), "after".len());
    }

    #[test]
    fn withheld_partial_open_marker_is_flushed_at_finish() {
        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed("see <thi"), "see ");
        assert_eq!(filter.pending_len(), "<thi".len());
        assert_eq!(filter.finish(), "<thi");
    }

    #[test]
    fn withheld_prefix_is_released_once_disproved() {
        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed("a <th"), "a ");
        assert_eq!(filter.feed("ree"), "<three");
    }

    #[test]
    fn finish_is_idempotent_and_safe_without_feed() {
        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.finish(), "");
        assert_eq!(filter.finish(), "");

        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed("done"), "done");
        assert_eq!(filter.finish(), "");
        assert_eq!(filter.finish(), "");
    }

    #[test]
    fn feed_after_finish_is_ignored() {
        let mut filter = ReasoningFilter::new(think());
        filter.feed("x");
        filter.finish();
        assert_eq!(filter.feed("late"), "");
        assert_eq!(filter.finish(), "");
    }

    #[test]
    fn empty_fragments_are_noops() {
        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed(""), "");
        assert_eq!(filter.feed("<thi"), "");
        assert_eq!(filter.feed(""), "");
        assert_eq!(filter.pending_len(), 4);
        assert_eq!(filter.state(), StreamState::Visible);
    }

    #[test]
    fn markers_split_one_character_at_a_time() {
        let text = "Hi<think>plan</think>there";
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
        let (outputs, tail) = run(&think(), &chunks);
        let joined = format!("{}{}", outputs.concat(), tail);
        assert_eq!(joined, "Hithere");
        for out in &outputs {
            assert!(!out.contains('<'), "leaked marker fragment: {out:?}");
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(
            run_joined(&think(), &["a<THINK>b</THINK>c"]),
            "a<THINK>b</THINK>c"
        );
    }

    #[test]
    fn stray_close_marker_in_visible_text_is_plain_text() {
        assert_eq!(run_joined(&think(), &["x</think>y"]), "x</think>y");
    }

    #[test]
    fn close_marker_ends_span_regardless_of_repeated_opens() {
        assert_eq!(
            run_joined(&think(), &["a<think>b<think>c</think>d</think>e"]),
            "ad</think>e"
        );
    }

    #[test]
    fn shared_prefix_markers_use_the_active_marker_only() {
        let markers = MarkerPair::new("<tag>", "<tag/>").unwrap();
        assert_eq!(run_joined(&markers, &["a<tag>b<tag/>c"]), "ac");

        let mut filter = ReasoningFilter::new(markers.clone());
        assert_eq!(filter.feed("x<ta"), "x");
        assert_eq!(filter.feed("g/>y"), "<tag/>y");

        let mut filter = ReasoningFilter::new(markers);
        assert_eq!(filter.feed("<tag>hidden<tag"), "");
        assert_eq!(filter.feed(">still hidden<tag/>shown"), "shown");
    }

    #[test]
    fn single_character_markers() {
        let markers = MarkerPair::new("[", "]").unwrap();
        let mut filter = ReasoningFilter::new(markers);
        assert_eq!(filter.feed("a[b"), "a");
        assert_eq!(filter.feed("c]d"), "d");
        assert_eq!(filter.pending_len(), 0);
    }

    #[test]
    fn multibyte_markers_and_text() {
        let markers = MarkerPair::new("《思考》", "《/思考》").unwrap();
        let text = "答案《思考》秘密《/思考》好的";
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(run_joined(&markers, &chunks), "答案好的");

        let mut filter = ReasoningFilter::new(think());
        assert_eq!(filter.feed("héllo <"), "héllo ");
        assert_eq!(filter.feed("é"), "<é");
    }

    #[test]
    fn strip_matches_streaming_output() {
        for text in CORPUS {
            assert_eq!(
                ReasoningFilter::strip(&think(), text),
                reference_strip(text, &think()),
                "input {text:?}"
            );
        }
    }

    #[test]
    fn every_two_and_three_way_split_matches_reference() {
        for text in CORPUS {
            let expected = reference_strip(text, &think());
            let bounds = char_boundaries(text);

            for &i in &bounds {
                let got = run_joined(&think(), &[&text[..i], &text[i..]]);
                assert_eq!(got, expected, "input {text:?} split at {i}");

                for &j in bounds.iter().filter(|&&j| j >= i) {
                    let got = run_joined(&think(), &[&text[..i], &text[i..j], &text[j..]]);
                    assert_eq!(got, expected, "input {text:?} split at {i},{j}");
                }
            }
        }
    }

    #[test]
    fn hidden_content_and_markers_never_leak() {
        let text = "Visible one.<think>SECRET alpha</think> Visible two.<think>SECRET beta</think>";
        let bounds = char_boundaries(text);
        for &i in &bounds {
            for &j in bounds.iter().filter(|&&j| j >= i) {
                let (outputs, tail) = run(&think(), &[&text[..i], &text[i..j], &text[j..]]);
                for out in outputs.iter().chain(std::iter::once(&tail)) {
                    assert!(!out.contains("SECRET"), "split {i},{j}: {out:?}");
                    assert!(!out.contains("alpha") && !out.contains("beta"));
                    assert!(!out.contains('<') && !out.contains('>'));
                }
                assert_eq!(
                    format!("{}{}", outputs.concat(), tail),
                    "Visible one. Visible two."
                );
            }
        }
    }

    #[test]
    fn output_without_open_marker_is_exactly_the_input() {
        let text = "Silhouette 0.41 < 0.5 means <th>overlap</th>; check cluster <t";
        let bounds = char_boundaries(text);
        for &i in &bounds {
            for &j in bounds.iter().filter(|&&j| j >= i) {
                assert_eq!(
                    run_joined(&think(), &[&text[..i], &text[i..j], &text[j..]]),
                    text
                );
            }
        }
    }

    #[test]
    fn partial_marker_len_cases() {
        assert_eq!(partial_marker_len("abc", "<think>"), 0);
        assert_eq!(partial_marker_len("abc<", "<think>"), 1);
        assert_eq!(partial_marker_len("abc<thin", "<think>"), 5);
        assert_eq!(partial_marker_len("<think", "<think>"), 6);
        // A complete marker is never a proper prefix.
        assert_eq!(partial_marker_len("x]", "]"), 0);
        assert_eq!(partial_marker_len("", "<think>"), 0);
        assert_eq!(partial_marker_len("《思", "《思考》"), "《思".len());
    }
}
