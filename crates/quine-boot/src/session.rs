//! The boot session state machine.
//!
//! Each cycle boots the current kernel glob, runs it with its own glob as
//! input, and checks that the output echoes the input byte for byte. A
//! verified kernel is promoted to stable and a mutated successor is staged
//! for the next cycle; a diverged kernel is replaced by a fresh mutation of
//! the last stable image. The corpus only learns a genome once the kernel
//! carrying it has verified.

use quine_core::glob::{decode_glob, encode_glob};
use quine_core::{
    BootConfig, Corpus, Genome, HistoryEntry, Result, RuntimeLimits, SystemEra, SystemState,
};
use quine_genome::seed_glob;
use quine_runtime::{KernelIo, Runtime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::snapshot::{SessionSnapshot, SnapshotManager};

pub struct BootSession {
    config: BootConfig,
    runtime: Runtime,
    rng: ChaCha8Rng,
    state: SystemState,
    era: SystemEra,
    /// Last kernel that verified. Repairs always restart from here.
    stable_glob: String,
    /// Kernel booted on the next cycle.
    current_glob: String,
    /// Mutated successor staged while the current kernel is still live.
    next_glob: Option<String>,
    /// Genome inside `current_glob` that has not yet proven itself.
    pending_genome: Option<Genome>,
    generation: u64,
    retry_count: u32,
    /// Monotone mutation counter; drives the action rotation.
    attempt: u64,
    evolution_count: u64,
    corpus: Corpus,
    history: Vec<HistoryEntry>,
    last_snapshot_generation: u64,
}

impl BootSession {
    /// Start a fresh session from the built-in seed kernel.
    pub fn new(config: BootConfig, limits: RuntimeLimits) -> Result<Self> {
        let runtime = Runtime::new(limits)?;
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let seed = seed_glob();

        Ok(Self {
            config,
            runtime,
            rng,
            state: SystemState::Idle,
            era: SystemEra::from_generation(0),
            stable_glob: seed.clone(),
            current_glob: seed,
            next_glob: None,
            pending_genome: None,
            generation: 0,
            retry_count: 0,
            attempt: 0,
            evolution_count: 0,
            corpus: Corpus::new(),
            history: Vec::new(),
            last_snapshot_generation: 0,
        })
    }

    /// Resume from a snapshot. The session boots the stable kernel; the
    /// candidate that may have been live at save time is gone, so there is
    /// no pending genome either.
    pub fn from_snapshot(
        config: BootConfig,
        limits: RuntimeLimits,
        snapshot: SessionSnapshot,
    ) -> Result<Self> {
        let mut session = Self::new(config, limits)?;
        session.stable_glob = snapshot.stable_glob.clone();
        session.current_glob = snapshot.stable_glob;
        session.generation = snapshot.generation;
        session.retry_count = snapshot.retry_count;
        session.attempt = snapshot.attempt;
        session.corpus = snapshot.corpus;
        session.history = snapshot.history;
        session.era = SystemEra::from_generation(snapshot.generation);
        session.last_snapshot_generation = snapshot.generation;
        Ok(session)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn era(&self) -> SystemEra {
        self.era
    }

    pub fn evolution_count(&self) -> u64 {
        self.evolution_count
    }

    pub fn stable_glob(&self) -> &str {
        &self.stable_glob
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: 1,
            timestamp: chrono::Utc::now().timestamp(),
            stable_glob: self.stable_glob.clone(),
            generation: self.generation,
            retry_count: self.retry_count,
            attempt: self.attempt,
            corpus: self.corpus.clone(),
            history: self.history.clone(),
        }
    }

    /// Run boot cycles until auto-reboot is disabled or the task is
    /// cancelled from outside.
    pub async fn run(&mut self, snapshots: &SnapshotManager) -> Result<()> {
        info!(
            "Session starting at generation {} ({} era), corpus holds {} genome(s)",
            self.generation,
            self.era,
            self.corpus.len()
        );

        loop {
            self.run_cycle().await;

            let interval = snapshots.config().interval_generations;
            if interval > 0
                && self.generation % interval == 0
                && self.generation != self.last_snapshot_generation
            {
                self.last_snapshot_generation = self.generation;
                if let Err(e) = snapshots.save(&self.snapshot()).await {
                    error!("Periodic snapshot failed: {}", e);
                }
            }

            if !self.config.auto_reboot {
                info!("Auto-reboot disabled, halting after one cycle");
                self.set_state(SystemState::Halted);
                return Ok(());
            }
        }
    }

    /// One full boot cycle: decode, instantiate, execute, verify, then
    /// either evolve or repair.
    async fn run_cycle(&mut self) {
        self.set_state(SystemState::Booting);

        let image = match decode_glob(&self.current_glob) {
            Ok(image) => image,
            Err(e) => {
                self.handle_divergence(format!("Kernel glob corrupted: {}", e));
                self.sleep_ms(self.config.repair_delay_ms).await;
                return;
            }
        };

        self.set_state(SystemState::LoadingKernel);
        info!("Loading kernel image: {} bytes", image.len());

        let mut instance = match self.runtime.instantiate(&image, KernelIo::new()) {
            Ok(instance) => instance,
            Err(e) => {
                self.handle_divergence(format!("Boot failure: {}", e));
                self.sleep_ms(self.config.repair_delay_ms).await;
                return;
            }
        };

        self.set_state(SystemState::Executing);
        let verdict = instance.reproduces(self.current_glob.as_bytes());

        for pages in instance.io().take_grow_log() {
            info!("Kernel grew guest memory by {} page(s)", pages);
        }

        match verdict {
            Ok(true) => {
                self.handle_reproduction(&image);
                self.sleep_ms(self.config.reboot_delay_ms).await;
            }
            Ok(false) => {
                self.handle_divergence(
                    "Output checksum mismatch (Self-Replication Failed)".to_string(),
                );
                self.sleep_ms(self.config.repair_delay_ms).await;
            }
            Err(e) => {
                self.handle_divergence(format!("Execution fault: {}", e));
                self.sleep_ms(self.config.repair_delay_ms).await;
            }
        }
    }

    /// The current kernel echoed its own glob. Promote it, learn its
    /// genome, stage a mutated successor, and advance the generation.
    fn handle_reproduction(&mut self, image: &[u8]) {
        self.set_state(SystemState::VerifyingQuine);
        info!("VERIFICATION: kernel echoed its own glob exactly");

        self.stable_glob = self.current_glob.clone();
        self.retry_count = 0;
        self.push_history("EXECUTE", "Verification Success".to_string(), true);

        // The genome that produced this kernel has now survived a
        // verification, so the corpus may learn it.
        if let Some(genome) = self.pending_genome.take() {
            if self.corpus.commit(genome) {
                debug!("Corpus learned a genome, {} total", self.corpus.len());
            }
        }

        self.evolve_next(image);

        self.generation += 1;
        if let Some(next) = self.next_glob.take() {
            self.current_glob = next;
        }
        self.update_era();
    }

    /// Mutate the verified image into next cycle's candidate. Candidates
    /// must pass module validation before they are allowed to boot.
    fn evolve_next(&mut self, image: &[u8]) {
        self.attempt += 1;

        match quine_genome::mutate(image, &self.corpus, self.attempt, &mut self.rng) {
            Ok(outcome) => match self.runtime.validate(&outcome.binary) {
                Ok(()) => {
                    info!("EVOLUTION: {}", outcome.description);
                    self.push_history("EVOLVE", outcome.description, true);
                    self.next_glob = Some(encode_glob(&outcome.binary));
                    self.pending_genome = outcome.genome;
                    self.evolution_count += 1;
                }
                Err(e) => {
                    warn!("EVOLUTION REJECTED: {}", e);
                    self.push_history("EVOLVE", format!("Validation Failed: {}", e), false);
                    self.next_glob = None;
                    self.pending_genome = None;
                }
            },
            Err(e) => {
                warn!("EVOLUTION ERROR: {}", e);
                self.push_history("EVOLVE", format!("Logic Error: {}", e), false);
                self.next_glob = None;
                self.pending_genome = None;
            }
        }
    }

    /// The current kernel failed to reproduce. Discard it and adopt a
    /// mutation of the stable image, falling back to the stable image
    /// itself when even mutation fails. Repair candidates boot without
    /// validation; an invalid one simply diverges again next cycle.
    fn handle_divergence(&mut self, reason: String) {
        self.set_state(SystemState::Repairing);
        error!("CRITICAL: {}", reason);
        self.push_history("REPAIR", reason, false);

        self.retry_count += 1;
        self.pending_genome = None;
        self.attempt += 1;

        let repaired = decode_glob(&self.stable_glob).and_then(|stable| {
            quine_genome::mutate(&stable, &self.corpus, self.attempt, &mut self.rng)
        });

        match repaired {
            Ok(outcome) => {
                info!("ADAPTATION: {}", outcome.description);
                self.current_glob = encode_glob(&outcome.binary);
                self.pending_genome = outcome.genome;
            }
            Err(e) => {
                warn!("ADAPTATION: falling back to the stable kernel ({})", e);
                self.current_glob = self.stable_glob.clone();
            }
        }
    }

    fn push_history(&mut self, action: &str, details: String, success: bool) {
        let kernel_size = decode_glob(&self.current_glob)
            .map(|image| image.len())
            .unwrap_or(0);
        self.history.push(HistoryEntry::new(
            self.generation,
            kernel_size,
            action,
            details,
            success,
        ));

        let max = self.config.max_history_entries;
        if self.history.len() > max {
            let excess = self.history.len() - max;
            self.history.drain(..excess);
        }
    }

    fn set_state(&mut self, state: SystemState) {
        if self.state != state {
            debug!("State transition: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn update_era(&mut self) {
        let era = SystemEra::from_generation(self.generation);
        if era != self.era {
            info!("Era transition: {} -> {}", self.era, era);
            self.era = era;
        }
    }

    async fn sleep_ms(&self, millis: u64) {
        sleep(Duration::from_millis(millis)).await;
    }
}
