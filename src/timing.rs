//! A tiny running-average stopwatch, used to track render and
//! composite/raster/draw time the way the original browser's
//! `MeasureTime` class did, surfaced through `log` rather than `print`.

use std::time::Instant;

pub struct MeasureTime {
    name: &'static str,
    start: Option<Instant>,
    total_secs: f64,
    count: u64,
}

impl MeasureTime {
    pub fn new(name: &'static str) -> Self {
        MeasureTime {
            name,
            start: None,
            total_secs: 0.0,
            count: 0,
        }
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        if let Some(start) = self.start.take() {
            self.total_secs += start.elapsed().as_secs_f64();
            self.count += 1;
        }
    }

    pub fn log_average(&self) {
        if self.count == 0 {
            return;
        }
        let avg_ms = (self.total_secs / self.count as f64) * 1000.0;
        log::info!("Time in {} on average: {:.0}ms", self.name, avg_ms);
    }
}
