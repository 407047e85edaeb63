use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BatError;
use crate::report::{BatIntermediate, CallbackAction};

/// Records optimization progress via the per-iteration callback
#[derive(Debug, Clone)]
pub struct OptimizationRecorder {
    /// Run name (used for the CSV filename)
    name: String,
    /// Shared records storage
    records: Arc<Mutex<Vec<OptimizationRecord>>>,
}

/// A single iteration record
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRecord {
    pub iteration: usize,
    /// Best position after the iteration
    pub x: Vec<f64>,
    pub best_fitness: f64,
    /// Whether this iteration raised the best fitness
    pub is_improvement: bool,
}

impl OptimizationRecorder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), records: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Create a callback that appends one record per iteration
    ///
    /// The callback never stops the run.
    pub fn create_callback(&self) -> Box<dyn FnMut(&BatIntermediate<'_>) -> CallbackAction + Send> {
        let records = self.records.clone();
        Box::new(move |intermediate: &BatIntermediate<'_>| -> CallbackAction {
            let mut guard = records.lock();
            let is_improvement = match guard.last() {
                Some(last) => intermediate.best.fitness > last.best_fitness,
                None => true,
            };
            guard.push(OptimizationRecord {
                iteration: intermediate.iteration,
                x: intermediate.best.position.to_vec(),
                best_fitness: intermediate.best.fitness,
                is_improvement,
            });
            CallbackAction::Continue
        })
    }

    /// Save all records to `<output_dir>/<name>.csv`
    pub fn save_to_csv(&self, output_dir: &Path) -> Result<PathBuf, BatError> {
        create_dir_all(output_dir)?;
        let filename = output_dir.join(format!("{}.csv", self.name));
        let mut writer = csv::Writer::from_path(&filename)?;

        let records = self.records.lock();
        let dims = records.first().map(|r| r.x.len()).unwrap_or(0);
        let mut header = vec!["iteration".to_string()];
        header.extend((0..dims).map(|i| format!("x{}", i)));
        header.push("best_fitness".into());
        header.push("is_improvement".into());
        writer.write_record(&header)?;

        for record in records.iter() {
            let mut row = vec![record.iteration.to_string()];
            row.extend(record.x.iter().map(|xi| format!("{:.16}", xi)));
            row.push(format!("{:.16}", record.best_fitness));
            row.push(record.is_improvement.to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(filename)
    }

    /// Get a copy of all recorded iterations
    pub fn get_records(&self) -> Vec<OptimizationRecord> {
        self.records.lock().clone()
    }

    pub fn num_iterations(&self) -> usize {
        self.records.lock().len()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Final best solution, if any iteration was recorded
    pub fn get_best_solution(&self) -> Option<(Vec<f64>, f64)> {
        self.records.lock().last().map(|r| (r.x.clone(), r.best_fitness))
    }
}
