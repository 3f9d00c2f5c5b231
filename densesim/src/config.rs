// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{error::Result, SimError};

/// Largest number of target qubits a single kernel application (and so a fused gate) may act on.
pub const MAX_TARGET_QUBITS: usize = 5;

/// Tuning knobs for a simulator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Seed for the random number generator used by measurements. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Whether gates are buffered and fused before being applied to the state vector.
    pub gate_fusion: bool,

    /// Once the fused gate reaches this many qubits it is applied right away.
    pub fusion_min_qubits: usize,

    /// Hard cap on the number of qubits a fused gate may act on.
    pub fusion_max_qubits: usize,

    /// Maximum number of gates held in the fusion buffer before it is applied.
    pub fusion_max_gates: usize,

    /// Registers smaller than this are always processed on the calling thread.
    pub parallel_min_qubits: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            gate_fusion: false,
            fusion_min_qubits: 4,
            fusion_max_qubits: MAX_TARGET_QUBITS,
            fusion_max_gates: 64,
            parallel_min_qubits: 14,
        }
    }
}

impl SimConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_gate_fusion(mut self, enabled: bool) -> Self {
        self.gate_fusion = enabled;
        self
    }

    #[must_use]
    pub fn with_fusion_qubits(mut self, min: usize, max: usize) -> Self {
        self.fusion_min_qubits = min;
        self.fusion_max_qubits = max;
        self
    }

    #[must_use]
    pub fn with_fusion_max_gates(mut self, max_gates: usize) -> Self {
        self.fusion_max_gates = max_gates;
        self
    }

    #[must_use]
    pub fn with_parallel_min_qubits(mut self, qubits: usize) -> Self {
        self.parallel_min_qubits = qubits;
        self
    }

    /// Checks that the fusion limits are consistent with the kernel.
    /// # Errors
    /// Returns `SimError::InvalidConfig` when a limit is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.fusion_max_qubits == 0 || self.fusion_max_qubits > MAX_TARGET_QUBITS {
            return Err(SimError::InvalidConfig(format!(
                "fusion_max_qubits must be between 1 and {MAX_TARGET_QUBITS}, got {}",
                self.fusion_max_qubits
            )));
        }
        if self.fusion_min_qubits > self.fusion_max_qubits {
            return Err(SimError::InvalidConfig(format!(
                "fusion_min_qubits ({}) exceeds fusion_max_qubits ({})",
                self.fusion_min_qubits, self.fusion_max_qubits
            )));
        }
        if self.fusion_max_gates == 0 {
            return Err(SimError::InvalidConfig(
                "fusion_max_gates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
