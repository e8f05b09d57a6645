use burn::train::renderer::{MetricState, MetricsRenderer, TrainingProgress};

/// Reports learner progress through `tracing` instead of the terminal dashboard.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    epoch: usize,
    validating: bool,
}

impl TracingRenderer {
    /// `true` the first time an epoch (or its validation pass) is seen.
    fn advance(&mut self, epoch: usize, validating: bool) -> bool {
        let changed = epoch != self.epoch || validating != self.validating;
        self.epoch = epoch;
        self.validating = validating;

        changed
    }
}

impl MetricsRenderer for TracingRenderer {
    fn update_train(&mut self, state: MetricState) {
        log_state("train", state);
    }

    fn update_valid(&mut self, state: MetricState) {
        log_state("valid", state);
    }

    fn render_train(&mut self, item: TrainingProgress) {
        if self.advance(item.epoch, false) {
            tracing::info!(epoch = item.epoch, epochs = item.epoch_total, "Training epoch");
        }
    }

    fn render_valid(&mut self, item: TrainingProgress) {
        if self.advance(item.epoch, true) {
            tracing::debug!(epoch = item.epoch, "Validating");
        }
    }
}

fn log_state(split: &str, state: MetricState) {
    match state {
        MetricState::Generic(entry) | MetricState::Numeric(entry, _) => {
            tracing::trace!(split, metric = %entry.name, value = %entry.formatted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_phase_of_an_epoch_is_announced_once() {
        let mut renderer = TracingRenderer::default();

        assert!(renderer.advance(1, false));
        assert!(!renderer.advance(1, false));
        assert!(renderer.advance(1, true));
        assert!(!renderer.advance(1, true));
        assert!(renderer.advance(2, false));
    }
}
