use std::time::Duration;

use async_trait::async_trait;

/// Relative length of a scripted pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    Brief,
    Normal,
    Long,
}

impl Beat {
    fn multiplier(self) -> u32 {
        match self {
            Beat::Brief => 1,
            Beat::Normal => 2,
            Beat::Long => 3,
        }
    }
}

/// Source of the pauses between scripted messages.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, beat: Beat);
}

/// Sleeps on the tokio timer. A brief beat lasts `base`, a long one three times that.
#[derive(Debug, Clone, Copy)]
pub struct TokioPacer {
    base: Duration,
}

impl TokioPacer {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn duration_of(&self, beat: Beat) -> Duration {
        self.base * beat.multiplier()
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, beat: Beat) {
        tokio::time::sleep(self.duration_of(beat)).await;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self, _beat: Beat) {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beats_scale_the_base_pause() {
        let pacer = TokioPacer::new(Duration::from_millis(500));
        assert_eq!(pacer.duration_of(Beat::Brief), Duration::from_millis(500));
        assert_eq!(pacer.duration_of(Beat::Normal), Duration::from_millis(1000));
        assert_eq!(pacer.duration_of(Beat::Long), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_sleeps_on_the_runtime_clock() {
        let pacer = TokioPacer::new(Duration::from_millis(500));
        let before = tokio::time::Instant::now();

        pacer.pause(Beat::Long).await;

        assert!(before.elapsed() >= Duration::from_millis(1500));
    }
}
