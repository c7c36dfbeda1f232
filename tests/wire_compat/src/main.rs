fn main() {
    println!("Run `cargo test -p wire-compat` to replay the recorded transfer fixtures.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use bledrop_protocol::{Phase, TransferEvent};
    use bledrop_transfer::{MemorySink, TransferConfig, TransferStateMachine};
    use serde::Deserialize;

    /// One recorded link event.
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum Step {
        Hex { hex: String },
        Text { text: String },
        Disconnect { disconnect: bool },
    }

    /// A recorded notification stream and the engine's expected reaction.
    #[derive(Debug, Deserialize)]
    struct Fixture {
        #[allow(dead_code)]
        description: String,
        config: TransferConfig,
        steps: Vec<Step>,
        expected_events: Vec<TransferEvent>,
        expected_phase: Phase,
        /// Calls made into the sink.
        writes: u64,
        /// Artifacts left in the sink afterwards.
        stored: usize,
    }

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads and parses a fixture file.
    fn load_fixture(name: &str) -> Fixture {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Replays a fixture through a fresh engine and checks every expectation.
    async fn replay(name: &str) {
        let fixture = load_fixture(name);
        let sink = Arc::new(MemorySink::new());
        let (mut machine, mut events) = TransferStateMachine::new(sink.clone(), fixture.config);

        for step in &fixture.steps {
            match step {
                Step::Hex { hex } => {
                    let data = hex::decode(hex)
                        .unwrap_or_else(|e| panic!("{name}: bad hex {hex:?}: {e}"));
                    machine.on_chunk(&data).await;
                }
                Step::Text { text } => {
                    machine.on_chunk(text.as_bytes()).await;
                }
                Step::Disconnect { disconnect } => {
                    if *disconnect {
                        machine.on_disconnect();
                    }
                }
            }
        }

        let mut seen = Vec::new();
        while let Ok(ev) = events.try_recv() {
            seen.push(ev);
        }

        assert_eq!(seen, fixture.expected_events, "event mismatch for {name}");
        assert_eq!(machine.phase(), fixture.expected_phase, "phase mismatch for {name}");
        assert_eq!(sink.writes(), fixture.writes, "write count mismatch for {name}");
        assert_eq!(sink.len(), fixture.stored, "stored count mismatch for {name}");
        assert_eq!(
            machine.session().bytes_received(),
            0,
            "buffer not cleared for {name}"
        );
    }

    #[tokio::test]
    async fn fixture_concrete_scenario() {
        replay("concrete_scenario.json").await;
    }

    #[tokio::test]
    async fn fixture_body_scope_completed() {
        replay("body_scope_completed.json").await;
    }

    #[tokio::test]
    async fn fixture_start_then_end() {
        replay("start_then_end.json").await;
    }

    #[tokio::test]
    async fn fixture_duplicate_start() {
        replay("duplicate_start.json").await;
    }

    #[tokio::test]
    async fn fixture_disconnect_mid_transfer() {
        replay("disconnect_mid_transfer.json").await;
    }

    #[tokio::test]
    async fn fixture_strict_stray_chunks() {
        replay("strict_stray_chunks.json").await;
    }

    #[test]
    fn every_fixture_is_exercised() {
        let mut names: Vec<String> = fs::read_dir(fixtures_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".json"))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "body_scope_completed.json",
                "concrete_scenario.json",
                "disconnect_mid_transfer.json",
                "duplicate_start.json",
                "start_then_end.json",
                "strict_stray_chunks.json",
            ]
        );
    }
}
