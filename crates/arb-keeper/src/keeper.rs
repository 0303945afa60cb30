//! Development-mode harness: wires synthetic gossip/bootstrap events into
//! [`arb_core::ArbCoreContext`] and exercises the lifecycle/topology/
//! simulation trinity end to end without a real gossip feed or RPC client.
//! Mirrors the source project's `Keeper::update_all_markets` update loop,
//! minus the market-physics domain logic and the on-chain submission path.

use std::collections::HashMap;

use arb_core::cache::SetOutcome;
use arb_core::commit::{CommitEvent, CommitOutcome};
use arb_core::entities::{BinArrayEntry, ClmmState, DlmmState, PoolEntry, TickArrayEntry, VaultEntry, VenueState};
use arb_core::sim::SwapRequest;
use arb_core::solver::{SolveOutcome, SolverConfig};
use arb_core::topology::FrozenTopology;
use arb_core::ArbCoreContext;
use arb_types::{Direction, Key, Source, Venue, BINS_PER_ARRAY, TICKS_PER_ARRAY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{KeeperConfig, TrackedPool};
use crate::error::KeeperError;

/// One arbitrage opportunity the harness found while quoting a pair of
/// tracked pools on the same token pair.
#[derive(Debug, Clone, Copy)]
pub struct Opportunity {
    pub buy_pool: Key,
    pub sell_pool: Key,
    pub optimal_input: u128,
    pub expected_gross_profit: u128,
}

pub struct Keeper {
    ctx: ArbCoreContext,
    config: KeeperConfig,
    rng: StdRng,
    slot: u64,
    write_sequence: u64,
    dry_run: bool,
    /// (base_mint, quote_mint) -> pool keys sharing that pair, used to seed
    /// candidate arbitrage legs without an O(n^2) scan over every field.
    pairs: HashMap<(Key, Key), Vec<Key>>,
}

impl Keeper {
    pub fn new(config: KeeperConfig, dry_run: bool) -> Result<Self, KeeperError> {
        config.validate()?;

        let ceilings = arb_core::context::CacheCeilings {
            tick_arrays: config.cache.tick_arrays,
            bin_arrays: config.cache.bin_arrays,
        };
        let mut ctx = ArbCoreContext::new(ceilings, config.default_fee_bps);
        ctx.topology_oracle.tick_array_radius = config.topology.tick_array_radius;
        ctx.topology_oracle.bin_array_radius = config.topology.bin_array_radius;
        ctx.trace = arb_core::trace::TraceSink::new(config.trace_buffer_capacity);

        let mut keeper = Self {
            ctx,
            config,
            rng: StdRng::seed_from_u64(0xA12B_0000_0000_0001),
            slot: 1,
            write_sequence: 0,
            dry_run,
            pairs: HashMap::new(),
        };
        keeper.seed_pools()?;
        Ok(keeper)
    }

    fn next_write_sequence(&mut self) -> u64 {
        self.write_sequence += 1;
        self.write_sequence
    }

    /// Commits one pool and its dependencies for every enabled entry in the
    /// config, then drives each through discover -> freeze -> activate so
    /// the harness starts with a live book rather than an empty one.
    fn seed_pools(&mut self) -> Result<(), KeeperError> {
        for tracked in self.config.pools.clone() {
            if !tracked.enabled {
                continue;
            }
            self.seed_one_pool(&tracked)?;
        }
        Ok(())
    }

    fn seed_one_pool(&mut self, tracked: &TrackedPool) -> Result<(), KeeperError> {
        let slot = self.slot;
        let venue_state = self.build_venue_state(tracked)?;
        let pool = PoolEntry {
            key: tracked.pool,
            base_mint: tracked.base_mint,
            quote_mint: tracked.quote_mint,
            base_vault: tracked.base_vault,
            quote_vault: tracked.quote_vault,
            slot,
            write_sequence: self.next_write_sequence(),
            source: Source::Gossip,
            venue: venue_state,
        };
        self.submit(CommitEvent::Pool(pool))?;

        let base_amount = self.rng.gen_range(500_000_000u64..5_000_000_000u64);
        let quote_amount = self.rng.gen_range(500_000_000u64..5_000_000_000u64);
        self.submit(CommitEvent::Vault(VaultEntry {
            key: tracked.base_vault,
            amount: base_amount,
            slot,
            write_sequence: self.next_write_sequence(),
            source: Source::Gossip,
        }))?;
        self.submit(CommitEvent::Vault(VaultEntry {
            key: tracked.quote_vault,
            amount: quote_amount,
            slot,
            write_sequence: self.next_write_sequence(),
            source: Source::Gossip,
        }))?;

        match tracked.venue {
            Venue::Clmm => self.seed_tick_array(tracked.pool, slot)?,
            Venue::Dlmm => self.seed_bin_array(tracked.pool, slot)?,
            _ => {}
        }

        self.pairs
            .entry(pair_key(tracked.base_mint, tracked.quote_mint))
            .or_default()
            .push(tracked.pool);

        self.try_activate(tracked.pool)?;
        Ok(())
    }

    fn build_venue_state(&self, tracked: &TrackedPool) -> Result<VenueState, KeeperError> {
        match tracked.venue {
            Venue::CpmmExplicitFee => {
                let (num, den) = tracked
                    .fee_numerator
                    .zip(tracked.fee_denominator)
                    .ok_or_else(|| KeeperError::InvalidConfig(format!("pool {}: missing fee fields", tracked.name)))?;
                Ok(VenueState::CpmmExplicitFee { fee_numerator: num, fee_denominator: den })
            }
            Venue::CpmmSharedFee => {
                let fee_config = tracked
                    .fee_config
                    .ok_or_else(|| KeeperError::InvalidConfig(format!("pool {}: missing fee_config", tracked.name)))?;
                Ok(VenueState::CpmmSharedFee { fee_config })
            }
            Venue::Clmm => {
                let tick_spacing = tracked
                    .tick_spacing
                    .ok_or_else(|| KeeperError::InvalidConfig(format!("pool {}: missing tick_spacing", tracked.name)))?;
                let mut occupancy = arb_core::bitmap::Bitmap1024::zero();
                occupancy.set(0);
                Ok(VenueState::Clmm(ClmmState {
                    tick_spacing,
                    current_tick: 0,
                    sqrt_price_x64: arb_math::tick_math::sqrt_price_at_tick(0).unwrap_or(1 << 64),
                    liquidity: 1_000_000_000_000,
                    occupancy,
                    fee_config: tracked.fee_config.unwrap_or(Key::ZERO),
                }))
            }
            Venue::Dlmm => {
                let bin_step_bps = tracked
                    .bin_step_bps
                    .ok_or_else(|| KeeperError::InvalidConfig(format!("pool {}: missing bin_step_bps", tracked.name)))?;
                let mut occupancy = arb_core::bitmap::Bitmap1024::zero();
                occupancy.set(0);
                Ok(VenueState::Dlmm(DlmmState {
                    bin_step_bps,
                    active_bin_id: 0,
                    base_factor: 10,
                    volatility_accumulator: 0,
                    variable_fee_control: 20_000,
                    protocol_share_bps: 2_000,
                    occupancy,
                }))
            }
        }
    }

    fn seed_tick_array(&mut self, pool: Key, slot: u64) -> Result<(), KeeperError> {
        self.submit(CommitEvent::Tick(TickArrayEntry {
            pool,
            start_tick: 0,
            account_key: pool,
            ticks: vec![arb_core::entities::Tick::default(); TICKS_PER_ARRAY],
            slot,
            write_sequence: self.next_write_sequence(),
            source: Source::Gossip,
        }))?;
        Ok(())
    }

    fn seed_bin_array(&mut self, pool: Key, slot: u64) -> Result<(), KeeperError> {
        let mut bins = vec![arb_core::entities::Bin::default(); BINS_PER_ARRAY];
        bins[0] = arb_core::entities::Bin { amount_x: 1_000_000_000, amount_y: 1_000_000_000 };
        self.submit(CommitEvent::Bin(BinArrayEntry {
            pool,
            array_index: 0,
            account_key: pool,
            bins,
            slot,
            write_sequence: self.next_write_sequence(),
            source: Source::Gossip,
        }))?;
        Ok(())
    }

    /// Freezes then activates `pool` if its topology is already resolvable
    /// from what has been committed so far. A no-op if the pool is not yet
    /// known, or its topology is not yet complete — `commit` will retry the
    /// promotion on every subsequent applied write for this pool anyway.
    fn try_activate(&mut self, pool: Key) -> Result<(), KeeperError> {
        if self.ctx.lifecycle.state(&pool).is_none() {
            return Ok(());
        }
        let topology = match self.ctx.freeze_topology(pool, self.slot) {
            Ok(topology) => topology,
            Err(_) => return Ok(()),
        };
        if let Err(reason) = self.report_if_incomplete(pool, &topology) {
            tracing::debug!(pool = %pool, reason = %reason, "pool not yet activatable");
        }
        Ok(())
    }

    fn report_if_incomplete(&mut self, pool: Key, topology: &FrozenTopology) -> Result<(), String> {
        let missing = self.ctx.missing_dependencies(topology);
        if missing.is_empty() {
            self.ctx.activate(pool, self.slot).map_err(|e| e.to_string())?;
            Ok(())
        } else {
            let reason = format!("{} missing dependencies", missing.len());
            let _ = self.ctx.mark_incomplete(pool, reason.clone());
            Err(reason)
        }
    }

    fn submit(&mut self, event: CommitEvent) -> Result<CommitOutcome, KeeperError> {
        let outcome = self
            .ctx
            .commit(event)
            .map_err(|e| KeeperError::InvalidConfig(format!("fatal contract violation during seeding: {e}")))?;
        Ok(outcome)
    }

    /// One iteration of the harness loop: advances the synthetic slot,
    /// perturbs every tracked pool's vault balances with a small random
    /// walk (as if a confirmed swap had just landed), drains and logs the
    /// trace stream, and searches for arbitrage across same-pair pools.
    pub fn run_once(&mut self) -> Vec<Opportunity> {
        self.slot += 1;
        let slot = self.slot;

        let pools: Vec<Key> = self.config.enabled_pools().into_iter().map(|p| p.pool).collect();
        for pool_key in pools {
            self.perturb_vaults(pool_key, slot);
        }

        self.drain_trace();

        let pairs = self.pairs.clone();
        let mut opportunities = Vec::new();
        for pool_keys in pairs.values() {
            if pool_keys.len() < 2 {
                continue;
            }
            for i in 0..pool_keys.len() {
                for j in (i + 1)..pool_keys.len() {
                    if let Some(opportunity) = self.probe_pair(pool_keys[i], pool_keys[j]) {
                        opportunities.push(opportunity);
                    }
                }
            }
        }
        opportunities
    }

    fn perturb_vaults(&mut self, pool: Key, slot: u64) {
        let Some(pool_entry) = self.ctx.pools.peek(&pool).cloned() else { return };
        let Some(base) = self.ctx.vaults.peek(&pool_entry.base_vault).copied() else { return };
        let Some(quote) = self.ctx.vaults.peek(&pool_entry.quote_vault).copied() else { return };

        let delta_bps = self.rng.gen_range(-25i64..=25i64);
        let new_base = apply_bps_delta(base.amount, delta_bps);
        let new_quote = apply_bps_delta(quote.amount, -delta_bps / 2);

        let base_write_sequence = self.next_write_sequence();
        let quote_write_sequence = self.next_write_sequence();
        let _ = self.submit(CommitEvent::Vault(VaultEntry {
            key: pool_entry.base_vault,
            amount: new_base,
            slot,
            write_sequence: base_write_sequence,
            source: Source::Gossip,
        }));
        let _ = self.submit(CommitEvent::Vault(VaultEntry {
            key: pool_entry.quote_vault,
            amount: new_quote,
            slot,
            write_sequence: quote_write_sequence,
            source: Source::Gossip,
        }));
    }

    fn probe_pair(&mut self, a: Key, b: Key) -> Option<Opportunity> {
        let config = self.config.solver;
        let solver_config = SolverConfig {
            min_profit_abs: config.min_profit_abs,
            min_profit_bps: config.min_profit_bps,
            min_trade_size: config.min_trade_size,
            max_impact_bps: config.max_impact_bps,
        };
        let outcome = self.ctx.solve_arbitrage(a, Direction::AToB, b, Direction::BToA, config.max_input, solver_config);
        match outcome {
            SolveOutcome::Profitable(solution) => {
                tracing::info!(
                    buy = %a,
                    sell = %b,
                    input = solution.optimal_input,
                    profit = solution.expected_gross_profit,
                    "found arbitrage opportunity"
                );
                Some(Opportunity {
                    buy_pool: a,
                    sell_pool: b,
                    optimal_input: solution.optimal_input,
                    expected_gross_profit: solution.expected_gross_profit,
                })
            }
            SolveOutcome::NoProfit => None,
            SolveOutcome::InsufficientLiquidity => None,
        }
    }

    /// Also probes forward-quote queries directly, mirroring
    /// `ArbCoreContext::simulate_swap`'s role as the downstream interface
    /// a bundle builder would call before constructing a transaction.
    pub fn quote(&mut self, pool: Key, amount_in: u128, direction: Direction) -> Option<u128> {
        self.ctx
            .simulate_swap(pool, SwapRequest { amount_in, direction, fee_override_bps: None, sqrt_price_limit_x64: None })
            .ok()
            .map(|r| r.amount_out)
    }

    fn drain_trace(&mut self) {
        for event in self.ctx.trace.drain() {
            let kind = event.kind.to_string();
            match event.outcome {
                SetOutcome::Applied => tracing::debug!(kind, key = %event.key, slot = event.slot, "applied"),
                SetOutcome::Invalid => tracing::warn!(kind, key = %event.key, "rejected invalid payload"),
                SetOutcome::Stale => tracing::trace!(kind, key = %event.key, "stale"),
            }
        }
    }

    /// Logs a summary of every cache's size/hit/miss/eviction counters,
    /// mirroring the source keeper's periodic health check.
    pub fn health_check(&self) {
        tracing::info!(
            pools = self.ctx.pools.stats().size,
            vaults = self.ctx.vaults.stats().size,
            ticks = self.ctx.ticks.stats().size,
            bins = self.ctx.bins.stats().size,
            trace_dropped = self.ctx.trace.dropped(),
            "keeper health check"
        );
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

fn pair_key(base_mint: Key, quote_mint: Key) -> (Key, Key) {
    if base_mint.as_bytes() <= quote_mint.as_bytes() {
        (base_mint, quote_mint)
    } else {
        (quote_mint, base_mint)
    }
}

/// Applies a signed basis-point delta to `amount`, floored at 1 so a vault
/// never commits a zero balance (which would make every downstream
/// simulation divide by zero).
fn apply_bps_delta(amount: u64, delta_bps: i64) -> u64 {
    let delta = (amount as i128 * delta_bps as i128) / 10_000;
    ((amount as i128 + delta).max(1)) as u64
}
