use crate::config::SessionConfig;
use crate::geometry::ClassificationResult;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub type SharedSession = Arc<Mutex<SessionStateMachine>>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("pose cycle must contain at least one pose")]
    EmptyPoseCycle,
}

// Each template contains exactly one `{pose}` placeholder.
const PROMPT_TEMPLATES: &[&str] = &[
    "Strike your best {pose} pose!",
    "Show me a strong {pose}!",
    "Hold that {pose} and breathe",
    "Time for {pose}, you've got this",
    "Give me ten seconds of {pose}",
];

/// Ordered, cyclic sequence of pose names.
#[derive(Debug, Clone)]
pub struct PoseCycle {
    names: Vec<String>,
}

impl PoseCycle {
    pub fn new(names: Vec<String>) -> Result<Self, SessionError> {
        if names.is_empty() {
            return Err(SessionError::EmptyPoseCycle);
        }
        Ok(Self { names })
    }

    pub fn first(&self) -> &str {
        &self.names[0]
    }

    /// Cyclic successor of `current`. A name that is not part of the cycle
    /// restarts it from the beginning.
    pub fn successor(&self, current: &str) -> &str {
        match self.names.iter().position(|name| name == current) {
            Some(index) => &self.names[(index + 1) % self.names.len()],
            None => self.first(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum HoldState {
    Idle,
    Posing { since: Instant },
}

/// What a single observation did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// No detection, wrong pose, or confidence at or below threshold.
    Idle,
    /// First matching observation, hold timer started.
    HoldStarted,
    /// Still matching, hold timer running.
    Holding,
    /// Hold completed, target advanced to the cyclic successor.
    PoseAdvanced,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub target_pose: String,
    pub prompt: String,
    pub posing: bool,
    pub held_ms: u64,
}

/// Tracks the target pose and whether the user is holding it long enough
/// to advance. Fed once per frame with the latest classification, or `None`
/// when the frame yielded no usable detection.
pub struct SessionStateMachine {
    cycle: PoseCycle,
    target_pose: String,
    hold: HoldState,
    confidence_threshold: f32,
    hold_duration: Duration,
    prompt: String,
}

impl SessionStateMachine {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let cycle = PoseCycle::new(config.poses.clone())?;
        let target_pose = cycle.first().to_string();
        let prompt = generate_prompt(&target_pose);

        Ok(Self {
            cycle,
            target_pose,
            hold: HoldState::Idle,
            confidence_threshold: config.confidence_threshold,
            hold_duration: Duration::from_secs(config.hold_secs),
            prompt,
        })
    }

    pub fn target_pose(&self) -> &str {
        &self.target_pose
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// One transition step. Any broken hold resets the timer to zero, there
    /// is no partial credit across interruptions. Never panics.
    pub fn observe(
        &mut self,
        classification: Option<&ClassificationResult>,
        now: Instant,
    ) -> SessionEvent {
        let matching = classification.is_some_and(|result| {
            result.label == self.target_pose && result.confidence > self.confidence_threshold
        });

        if !matching {
            self.hold = HoldState::Idle;
            return SessionEvent::Idle;
        }

        match self.hold {
            HoldState::Idle => {
                self.hold = HoldState::Posing { since: now };
                SessionEvent::HoldStarted
            }
            HoldState::Posing { since } => {
                if now.duration_since(since) >= self.hold_duration {
                    self.advance();
                    SessionEvent::PoseAdvanced
                } else {
                    SessionEvent::Holding
                }
            }
        }
    }

    fn advance(&mut self) {
        self.target_pose = self.cycle.successor(&self.target_pose).to_string();
        self.prompt = generate_prompt(&self.target_pose);
        self.hold = HoldState::Idle;
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let (posing, held_ms) = match self.hold {
            HoldState::Idle => (false, 0),
            HoldState::Posing { since } => (true, now.duration_since(since).as_millis() as u64),
        };
        SessionSnapshot {
            target_pose: self.target_pose.clone(),
            prompt: self.prompt.clone(),
            posing,
            held_ms,
        }
    }
}

fn generate_prompt(target_pose: &str) -> String {
    let mut rng = rand::rng();
    let template = PROMPT_TEMPLATES[rng.random_range(0..PROMPT_TEMPLATES.len())];
    template.replace("{pose}", target_pose)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SessionConfig {
        SessionConfig {
            poses: vec!["y".into(), "lunge".into(), "warrior".into()],
            confidence_threshold: 90.0,
            hold_secs: 10,
        }
    }

    fn classified(label: &str, confidence: f32) -> ClassificationResult {
        ClassificationResult {
            label: label.into(),
            confidence,
        }
    }

    #[test]
    fn starts_idle_on_first_pose() {
        let session = SessionStateMachine::new(&test_config()).unwrap();
        assert_eq!(session.target_pose(), "y");
        assert!(!session.snapshot(Instant::now()).posing);
    }

    #[test]
    fn matching_observation_starts_hold() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let t0 = Instant::now();

        let event = session.observe(Some(&classified("y", 95.0)), t0);

        assert_eq!(event, SessionEvent::HoldStarted);
        assert!(session.snapshot(t0).posing);
        assert_eq!(session.target_pose(), "y");
    }

    #[test]
    fn full_hold_advances_to_cyclic_successor() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let t0 = Instant::now();

        session.observe(Some(&classified("y", 95.0)), t0);
        let event = session.observe(Some(&classified("y", 95.0)), t0 + Duration::from_secs(10));

        assert_eq!(event, SessionEvent::PoseAdvanced);
        assert_eq!(session.target_pose(), "lunge");
        assert!(!session.snapshot(t0 + Duration::from_secs(10)).posing);
    }

    #[test]
    fn low_confidence_keeps_session_idle() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let t0 = Instant::now();

        session.observe(Some(&classified("y", 95.0)), t0);
        session.observe(Some(&classified("y", 95.0)), t0 + Duration::from_secs(10));

        // Confidence below threshold right after the advancement.
        let event = session.observe(
            Some(&classified("lunge", 50.0)),
            t0 + Duration::from_millis(10_100),
        );

        assert_eq!(event, SessionEvent::Idle);
        assert_eq!(session.target_pose(), "lunge");
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let event = session.observe(Some(&classified("y", 90.0)), Instant::now());
        assert_eq!(event, SessionEvent::Idle);
    }

    #[test]
    fn ten_spaced_observations_advance_exactly_once() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let t0 = Instant::now();

        let mut advancements = 0;
        for i in 0..10 {
            let event = session.observe(
                Some(&classified("y", 95.0)),
                t0 + Duration::from_millis(i * 1_200),
            );
            if event == SessionEvent::PoseAdvanced {
                advancements += 1;
            }
        }

        assert_eq!(advancements, 1);
        assert_eq!(session.target_pose(), "lunge");
    }

    #[test]
    fn interruption_resets_hold_with_no_partial_credit() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let t0 = Instant::now();

        session.observe(Some(&classified("y", 95.0)), t0);
        session.observe(Some(&classified("y", 95.0)), t0 + Duration::from_secs(6));

        // Broken hold at six seconds in.
        session.observe(Some(&classified("warrior", 95.0)), t0 + Duration::from_secs(7));

        // Eight more matching seconds: cumulative time exceeds the hold
        // requirement but the continuous hold does not.
        session.observe(Some(&classified("y", 95.0)), t0 + Duration::from_secs(8));
        let event = session.observe(Some(&classified("y", 95.0)), t0 + Duration::from_secs(15));

        assert_eq!(event, SessionEvent::Holding);
        assert_eq!(session.target_pose(), "y");
    }

    #[test]
    fn no_detection_resets_posing() {
        let mut session = SessionStateMachine::new(&test_config()).unwrap();
        let t0 = Instant::now();

        session.observe(Some(&classified("y", 95.0)), t0);
        assert!(session.snapshot(t0).posing);

        let event = session.observe(None, t0 + Duration::from_secs(1));

        assert_eq!(event, SessionEvent::Idle);
        assert!(!session.snapshot(t0 + Duration::from_secs(1)).posing);
    }

    #[test]
    fn cycle_wraps_back_to_first_pose() {
        let cycle =
            PoseCycle::new(vec!["y".into(), "lunge".into(), "warrior".into()]).unwrap();
        assert_eq!(cycle.successor("y"), "lunge");
        assert_eq!(cycle.successor("lunge"), "warrior");
        assert_eq!(cycle.successor("warrior"), "y");
        assert_eq!(cycle.successor("unknown"), "y");
    }

    #[test]
    fn empty_cycle_is_rejected() {
        assert!(matches!(
            PoseCycle::new(vec![]),
            Err(SessionError::EmptyPoseCycle)
        ));
    }

    #[test]
    fn prompt_always_names_the_target_pose() {
        // Pose names that appear in no template, so only substitution can
        // put them into the prompt.
        let config = SessionConfig {
            poses: vec!["zzpose".into(), "qqpose".into()],
            confidence_threshold: 90.0,
            hold_secs: 10,
        };
        let mut session = SessionStateMachine::new(&config).unwrap();
        assert!(session.prompt().contains("zzpose"));

        let t0 = Instant::now();
        session.observe(Some(&classified("zzpose", 95.0)), t0);
        session.observe(Some(&classified("zzpose", 95.0)), t0 + Duration::from_secs(10));

        assert!(session.prompt().contains("qqpose"));
    }
}
