//! Demo Adapter
//!
//! Synthesizes a noisy sinusoid standing in for a real potentiometer,
//! so the rest of the pipeline can be exercised with no hardware. Values
//! are emitted as text lines exactly like a device would send them.

use crate::infrastructure::transport::TransportEvent;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::info;

pub struct DemoTransport {
    period: Duration,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl DemoTransport {
    pub fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    /// Start the generator. No external resources, so this cannot fail.
    pub fn connect(&mut self, events: mpsc::UnboundedSender<TransportEvent>) {
        let period = self.period;
        info!("Demo generator started at {:?} period", period);

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut t_ms: f64 = 0.0;
            let mut seed: u32 = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or(12345)
                | 1;

            loop {
                interval.tick().await;
                t_ms += period.as_millis() as f64;

                seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = ((seed >> 16) as f64 / 32768.0 - 1.0) * 25.0;
                let value = (512.0 + 400.0 * (t_ms / 1000.0).sin() + noise)
                    .round()
                    .clamp(0.0, 1023.0) as i32;

                if events.send(TransportEvent::Line(value.to_string())).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop the generator. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Demo generator stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn generates_numeric_lines_within_the_adc_domain() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let mut transport = DemoTransport::new(Duration::from_millis(100));
        transport.connect(events);

        for _ in 0..20 {
            let event = rx.recv().await.expect("generator should keep producing");
            let TransportEvent::Line(line) = event else {
                panic!("demo only emits lines");
            };
            let value: i32 = line.parse().expect("demo lines are numeric");
            assert!((0..=1023).contains(&value), "value {value} out of domain");
        }

        transport.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_the_generator() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let mut transport = DemoTransport::new(Duration::from_millis(100));
        transport.connect(events);

        let _ = rx.recv().await;
        transport.disconnect();
        transport.disconnect(); // no-op the second time

        // nothing further arrives once the task is gone
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
