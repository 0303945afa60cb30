//! The owning context struct: every cache, the lifecycle registry, the
//! topology and fee oracles, and the trace sink live here as plain fields,
//! with no singletons and no interior mutability beyond what each cache
//! needs. `!Sync` by construction, meant to be driven by exactly one task.
//! Nothing here reaches for `Mutex` or `RefCell`.

use arb_types::{Direction, EntityKind, Key, Source, ARB_SOLVER_GRADIENT_PROBE_BPS, ARB_SOLVER_MAX_ITERATIONS};

use crate::cache::{BinCache, PoolCache, SetOutcome, SingletonConfigCache, TickCache, VaultCache, VenueConfigCache};
use crate::commit::{CommitEvent, CommitOutcome, DiagnosticRateLimiter};
use crate::entities::VenueState;
use crate::error::{CoreResult, FatalReason};
use crate::fee_oracle::FeeOracle;
use crate::lifecycle::{LifecycleError, LifecycleRegistry, LifecycleState};
use crate::sim::{clmm as sim_clmm, cpmm as sim_cpmm, dlmm as sim_dlmm, SimError, SimOutcome, SwapRequest};
use crate::solver::{ArbSolution, CpmmShortcutLeg, SolveOutcome, SolverConfig};
use crate::topology::{DependencyRef, FrozenTopology, TopologyOracle};
use crate::trace::{TraceEvent, TraceSink};

/// Cache-size ceilings for the two array caches. Pool/vault/venue-config/
/// singleton-config caches are unbounded
/// since their cardinality is the tracked-pool count, not the tick/bin
/// space.
#[derive(Debug, Clone, Copy)]
pub struct CacheCeilings {
    pub tick_arrays: usize,
    pub bin_arrays: usize,
}

impl Default for CacheCeilings {
    fn default() -> Self {
        Self {
            tick_arrays: 18_000,
            bin_arrays: 18_000,
        }
    }
}

pub struct ArbCoreContext {
    pub pools: PoolCache,
    pub vaults: VaultCache,
    pub ticks: TickCache,
    pub bins: BinCache,
    pub venue_configs: VenueConfigCache,
    pub singleton_configs: SingletonConfigCache,
    pub lifecycle: LifecycleRegistry,
    pub fee_oracle: FeeOracle,
    pub topology_oracle: TopologyOracle,
    pub trace: TraceSink,
    rate_limiter: DiagnosticRateLimiter,
    ceilings: CacheCeilings,
}

impl Default for ArbCoreContext {
    fn default() -> Self {
        Self {
            pools: PoolCache::new(),
            vaults: VaultCache::new(),
            ticks: TickCache::new(),
            bins: BinCache::new(),
            venue_configs: VenueConfigCache::new(),
            singleton_configs: SingletonConfigCache::new(),
            lifecycle: LifecycleRegistry::default(),
            fee_oracle: FeeOracle::default(),
            topology_oracle: TopologyOracle::default(),
            trace: TraceSink::default(),
            rate_limiter: DiagnosticRateLimiter::default(),
            ceilings: CacheCeilings::default(),
        }
    }
}

impl ArbCoreContext {
    pub fn new(ceilings: CacheCeilings, default_fee_bps: u64) -> Self {
        Self {
            fee_oracle: FeeOracle::new(default_fee_bps),
            ceilings,
            ..Self::default()
        }
    }

    /// The canonical commit function. The only entry point that ever
    /// mutates a typed cache.
    pub fn commit(&mut self, event: CommitEvent) -> CoreResult<CommitOutcome> {
        if event.key().is_zero() {
            return Err(FatalReason::ZeroKey.into());
        }

        let owning_pool = self.owning_pool_for(&event);
        if event.source() == Source::Bootstrap {
            let allowed = match &event {
                CommitEvent::Pool(e) => self.lifecycle.rpc_allowed_for_pool(&e.key),
                CommitEvent::Vault(e) => self.lifecycle.rpc_allowed_for_vault(&e.key),
                CommitEvent::Tick(e) => self.lifecycle.rpc_allowed_for_pool(&e.pool),
                CommitEvent::Bin(e) => self.lifecycle.rpc_allowed_for_pool(&e.pool),
                CommitEvent::VenueConfig(e) => self.lifecycle.rpc_allowed_for_fee_config(&e.key),
                CommitEvent::SingletonConfig(_) => true,
            };
            if !allowed {
                if self.rate_limiter.should_emit(event.key()) {
                    tracing::warn!(
                        kind = %event.kind(),
                        key = %event.key(),
                        "rejected bootstrap write: pool is topology-frozen or active"
                    );
                }
                self.emit_trace(&event, SetOutcome::Invalid, Some("rejected_by_lifecycle"));
                return Ok(CommitOutcome::RejectedByLifecycle);
            }
        }

        let outcome = self.apply(event.clone());
        self.emit_trace(&event, outcome, None);

        let result = match outcome {
            SetOutcome::Applied => CommitOutcome::Applied,
            SetOutcome::Stale => CommitOutcome::Stale,
            SetOutcome::Invalid => CommitOutcome::RejectedInvalid,
        };

        if result == CommitOutcome::Applied {
            if let CommitEvent::Pool(e) = &event {
                self.lifecycle.discover_pool(e.key, e.slot);
            }
            self.ticks.evict_if_over(self.ceilings.tick_arrays, |pool| self.lifecycle.is_protected(&pool));
            self.bins.evict_if_over(self.ceilings.bin_arrays, |pool| self.lifecycle.is_protected(&pool));
            if let Some(pool) = owning_pool {
                self.try_promote(pool);
            }
        }

        Ok(result)
    }

    fn apply(&mut self, event: CommitEvent) -> SetOutcome {
        match event {
            CommitEvent::Pool(e) => self.pools.set(e),
            CommitEvent::Vault(e) => self.vaults.set(e),
            CommitEvent::Tick(e) => self.ticks.set(e),
            CommitEvent::Bin(e) => self.bins.set(e),
            CommitEvent::VenueConfig(e) => self.venue_configs.set(e),
            CommitEvent::SingletonConfig(e) => self.singleton_configs.set(e),
        }
    }

    fn emit_trace(&mut self, event: &CommitEvent, outcome: SetOutcome, reason: Option<&'static str>) {
        let existing_slot = match event {
            CommitEvent::Pool(e) => self.pools.peek(&e.key).map(|x| x.slot),
            CommitEvent::Vault(e) => self.vaults.peek(&e.key).map(|x| x.slot),
            CommitEvent::Tick(e) => self.ticks.peek(&(e.pool, e.start_tick)).map(|x| x.slot),
            CommitEvent::Bin(e) => self.bins.peek(&(e.pool, e.array_index)).map(|x| x.slot),
            CommitEvent::VenueConfig(e) => self.venue_configs.peek(&e.key).map(|x| x.slot),
            CommitEvent::SingletonConfig(e) => self.singleton_configs.peek(&e.key).map(|x| x.slot),
        };
        self.trace.emit(TraceEvent {
            kind: event.kind(),
            key: event.key().to_string(),
            slot: event.slot(),
            write_sequence: event.write_sequence(),
            source: event.source(),
            outcome,
            reason,
            existing_slot,
        });
    }

    /// Resolves the pool an event's acceptance/promotion logic applies to.
    /// `None` for a singleton-config event, which is not owned by any one
    /// pool.
    pub fn owning_pool_for(&self, event: &CommitEvent) -> Option<Key> {
        match event {
            CommitEvent::Pool(e) => Some(e.key),
            CommitEvent::Vault(e) => self.lifecycle.owning_pool_for_vault(&e.key),
            CommitEvent::Tick(e) => Some(e.pool),
            CommitEvent::Bin(e) => Some(e.pool),
            CommitEvent::VenueConfig(e) => self.lifecycle.owning_pool_for_fee_config(&e.key),
            CommitEvent::SingletonConfig(_) => None,
        }
    }

    /// If `pool` is `TopologyFrozen` and its topology is now fully
    /// resolvable against the live caches, promotes it to `Active`.
    fn try_promote(&mut self, pool: Key) {
        if self.lifecycle.state(&pool) != Some(LifecycleState::TopologyFrozen) {
            return;
        }
        let Some(topology) = self.lifecycle.get(&pool).and_then(|e| e.frozen_topology.clone()) else {
            return;
        };
        if self.topology_oracle.is_topology_complete(
            &topology,
            &self.vaults,
            &self.ticks,
            &self.bins,
            &self.venue_configs,
            &self.singleton_configs,
        ) {
            let slot = topology.freeze_slot;
            if self.lifecycle.activate(pool, slot).is_ok() {
                tracing::debug!(pool = %pool, "topology complete, pool activated");
            }
        }
    }

    pub fn mark_array_non_existent(&mut self, kind: EntityKind, pool: Key, index: i32) {
        match kind {
            EntityKind::Tick => self.ticks.mark_non_existent(pool, index),
            EntityKind::Bin => self.bins.mark_non_existent(pool, index),
            _ => {}
        }
    }

    // -- lifecycle passthroughs (spec §4.3, §6) --

    pub fn discover_pool(&mut self, pool: Key, slot: u64) {
        self.lifecycle.discover_pool(pool, slot);
    }

    pub fn freeze_topology(&mut self, pool: Key, slot: u64) -> Result<FrozenTopology, LifecycleError> {
        let pool_entry = self.pools.peek(&pool).cloned();
        let topology = self
            .topology_oracle
            .compute_topology(pool_entry.as_ref())
            .ok_or(LifecycleError::UnknownPool(pool))?;
        self.lifecycle.freeze_topology(pool, topology.clone(), slot)?;
        Ok(topology)
    }

    pub fn activate(&mut self, pool: Key, slot: u64) -> Result<(), LifecycleError> {
        self.lifecycle.activate(pool, slot)
    }

    pub fn mark_incomplete(&mut self, pool: Key, reason: impl Into<String>) -> Result<(), LifecycleError> {
        self.lifecycle.mark_incomplete(pool, reason)
    }

    pub fn start_refresh(
        &mut self,
        pool: Key,
        slot: u64,
        reason: impl Into<String>,
        min_interval_override_ms: Option<u64>,
    ) -> Result<(), LifecycleError> {
        self.lifecycle.start_refresh(pool, slot, reason, min_interval_override_ms)
    }

    pub fn abort_refresh(&mut self, pool: Key, slot: u64) -> Result<(), LifecycleError> {
        self.lifecycle.abort_refresh(pool, slot)
    }

    pub fn deactivate(&mut self, pool: Key, slot: u64, reason: impl Into<String>) -> Result<(), LifecycleError> {
        self.lifecycle.deactivate(pool, slot, reason)
    }

    pub fn get_topology(&self, pool: &Key) -> Option<FrozenTopology> {
        self.lifecycle.get(pool).and_then(|e| e.frozen_topology.clone())
    }

    pub fn missing_dependencies(&self, topology: &FrozenTopology) -> Vec<DependencyRef> {
        self.topology_oracle.missing_dependencies(
            topology,
            &self.vaults,
            &self.ticks,
            &self.bins,
            &self.venue_configs,
            &self.singleton_configs,
        )
    }

    pub fn learn_fee(
        &mut self,
        pool: Key,
        direction: Direction,
        pre_reserve_in: u128,
        pre_reserve_out: u128,
        amount_in: u128,
        actual_out: u128,
        slot: u64,
        now_unix_ms: u64,
    ) -> bool {
        self.fee_oracle
            .learn_fee(pool, direction, pre_reserve_in, pre_reserve_out, amount_in, actual_out, slot, now_unix_ms)
    }

    fn reserves(&self, base_vault: Key, quote_vault: Key, direction: Direction) -> (u128, u128) {
        let base = self.vaults.peek(&base_vault).map(|v| v.amount as u128).unwrap_or(0);
        let quote = self.vaults.peek(&quote_vault).map(|v| v.amount as u128).unwrap_or(0);
        match direction {
            Direction::AToB => (base, quote),
            Direction::BToA => (quote, base),
        }
    }

    /// Resolves the fee for a constant-product or CLMM quote. Never called
    /// for `VenueState::Dlmm` — DLMM's fee is the bin-step/volatility
    /// formula computed inside `sim_dlmm::simulate_swap` itself (spec
    /// §4.5's fee oracle only ever learns constant-product fees, and §4.8's
    /// dynamic fee has nothing to do with it).
    fn resolved_fee_bps(&self, pool: Key, direction: Direction, venue: &VenueState, override_bps: Option<u64>) -> u64 {
        if let Some(bps) = override_bps {
            return bps;
        }
        match venue {
            VenueState::CpmmExplicitFee { fee_numerator, fee_denominator } => {
                if *fee_denominator == 0 {
                    self.fee_oracle.fee(pool, direction)
                } else {
                    fee_numerator.saturating_mul(10_000) / fee_denominator
                }
            }
            VenueState::CpmmSharedFee { fee_config } => self
                .singleton_configs
                .peek(fee_config)
                .filter(|c| c.fee_denominator != 0)
                .map(|c| c.fee_numerator.saturating_mul(10_000) / c.fee_denominator)
                .unwrap_or_else(|| self.fee_oracle.fee(pool, direction)),
            VenueState::Clmm(state) => self
                .venue_configs
                .peek(&state.fee_config)
                .map(|c| c.fee_bps as u64)
                .unwrap_or_else(|| self.fee_oracle.fee(pool, direction)),
            VenueState::Dlmm(_) => unreachable!("Dlmm fee is resolved by sim_dlmm::simulate_swap, not resolved_fee_bps"),
        }
    }

    /// Dispatches a swap quote by venue (spec §4.6-4.8). The only place in
    /// the crate where venue family decides the code path.
    pub fn simulate_swap(&mut self, pool: Key, request: SwapRequest) -> SimOutcome {
        let Some(entry) = self.pools.peek(&pool).cloned() else {
            return Err(SimError::InsufficientLiquidity);
        };

        match &entry.venue {
            VenueState::CpmmExplicitFee { .. } | VenueState::CpmmSharedFee { .. } => {
                let fee_bps = self.resolved_fee_bps(pool, request.direction, &entry.venue, request.fee_override_bps);
                let (reserve_in, reserve_out) = self.reserves(entry.base_vault, entry.quote_vault, request.direction);
                sim_cpmm::simulate_exact_input(request.amount_in, reserve_in, reserve_out, fee_bps)
            }
            VenueState::Clmm(state) => {
                let fee_bps = self.resolved_fee_bps(pool, request.direction, &entry.venue, request.fee_override_bps);
                sim_clmm::simulate_swap(
                    &mut self.ticks,
                    pool,
                    state,
                    request.amount_in,
                    request.direction,
                    fee_bps,
                    request.sqrt_price_limit_x64,
                )
            }
            // No fallback to the (constant-product-only) fee oracle here:
            // `request.fee_override_bps` passes through as-is so `None`
            // reaches `sim_dlmm::simulate_swap` and falls through to the
            // dynamic bin-step/volatility fee (spec §4.8).
            VenueState::Dlmm(state) => sim_dlmm::simulate_swap(
                &mut self.bins,
                pool,
                state,
                request.amount_in,
                request.direction,
                request.fee_override_bps,
            )
            .map(|r| r.sim),
        }
    }

    /// A `CpmmShortcutLeg` for `pool` if (and only if) it is a
    /// constant-product venue, used to seed the solver's closed-form guess.
    fn cpmm_shortcut_leg(&self, pool: Key, direction: Direction) -> Option<CpmmShortcutLeg> {
        let entry = self.pools.peek(&pool)?;
        if !entry.venue_tag().is_constant_product() {
            return None;
        }
        let (reserve_in, reserve_out) = self.reserves(entry.base_vault, entry.quote_vault, direction);
        let fee_bps = self.resolved_fee_bps(pool, direction, &entry.venue, None);
        Some(CpmmShortcutLeg { reserve_in, reserve_out, fee_bps })
    }

    /// Arbitrage search across two live pools (spec §4.9), wired against
    /// this context's own caches. Buys the mid token on `buy_pool` in
    /// `buy_direction`, then sells it back on `sell_pool` in
    /// `sell_direction`. Structured as a direct binary search over `&mut
    /// self` rather than routing through [`crate::solver::ArbSolver`]'s
    /// closure-based API, since the CLMM/DLMM legs need mutable access to
    /// the tick/bin caches that two simultaneously-live `Fn` closures could
    /// not both hold.
    pub fn solve_arbitrage(
        &mut self,
        buy_pool: Key,
        buy_direction: Direction,
        sell_pool: Key,
        sell_direction: Direction,
        max_input: u128,
        config: SolverConfig,
    ) -> SolveOutcome {
        if max_input == 0 {
            return SolveOutcome::InsufficientLiquidity;
        }

        let probe = |ctx: &mut Self, amount: u128| -> Option<(i128, u64, u64)> {
            if amount == 0 {
                return Some((0, 0, 0));
            }
            let bought = ctx
                .simulate_swap(buy_pool, SwapRequest { amount_in: amount, direction: buy_direction, fee_override_bps: None, sqrt_price_limit_x64: None })
                .ok()?;
            let sold = ctx
                .simulate_swap(
                    sell_pool,
                    SwapRequest { amount_in: bought.amount_out, direction: sell_direction, fee_override_bps: None, sqrt_price_limit_x64: None },
                )
                .ok()?;
            let profit = sold.amount_out as i128 - amount as i128;
            Some((profit, bought.impact_bps, sold.impact_bps))
        };

        let initial_guess = match (self.cpmm_shortcut_leg(buy_pool, buy_direction), self.cpmm_shortcut_leg(sell_pool, sell_direction)) {
            (Some(buy), Some(sell)) => crate::solver::closed_form_initial_guess(buy, sell),
            _ => max_input / 2,
        }
        .clamp(1, max_input);

        let mut lo: u128 = 0;
        let mut hi: u128 = max_input;
        let mut best: Option<(u128, i128, u64, u64)> = probe(self, 0).map(|(p, b, s)| (0, p, b, s));
        let mut mid = initial_guess;

        for i in 0..ARB_SOLVER_MAX_ITERATIONS {
            if hi <= lo {
                break;
            }
            if i > 0 {
                mid = lo + (hi - lo) / 2;
            }
            if let Some((profit, buy_impact, sell_impact)) = probe(self, mid) {
                if best.map(|(_, p, ..)| profit > p).unwrap_or(true) {
                    best = Some((mid, profit, buy_impact, sell_impact));
                }
            }

            let span = (hi - lo).max(2);
            let step = (span.saturating_mul(ARB_SOLVER_GRADIENT_PROBE_BPS as u128) / 10_000).max(1);
            let left = mid.saturating_sub(step).max(lo);
            let right = (mid.saturating_add(step)).min(hi);
            let profit_left = probe(self, left).map(|(p, ..)| p).unwrap_or(i128::MIN);
            let profit_right = probe(self, right).map(|(p, ..)| p).unwrap_or(i128::MIN);

            if profit_right >= profit_left {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let Some((amount, profit, buy_impact, sell_impact)) = best.filter(|(amount, ..)| *amount > 0) else {
            return SolveOutcome::InsufficientLiquidity;
        };

        if amount < config.min_trade_size {
            return SolveOutcome::InsufficientLiquidity;
        }
        if buy_impact > config.max_impact_bps || sell_impact > config.max_impact_bps {
            return SolveOutcome::InsufficientLiquidity;
        }
        if profit <= 0 {
            return SolveOutcome::NoProfit;
        }
        let profit = profit as u128;
        let meets_abs_floor = profit >= config.min_profit_abs;
        let meets_bps_floor = profit.saturating_mul(10_000) / amount.max(1) >= config.min_profit_bps as u128;
        if !meets_abs_floor || !meets_bps_floor {
            return SolveOutcome::NoProfit;
        }

        SolveOutcome::Profitable(ArbSolution {
            optimal_input: amount,
            expected_gross_profit: profit,
            buy_leg_impact_bps: buy_impact,
            sell_leg_impact_bps: sell_impact,
        })
    }
}
