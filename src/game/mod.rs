//! Room state machine - the public operation surface
//!
//! A room moves `WaitingForPlayerB -> WaitingForReveal -> {Completed |
//! Forfeited}`, with a direct exit to `Forfeited` when an unjoined room
//! expires. Every mutating operation executes inside one write-lock
//! critical section: validation first, ledger movement second, room
//! mutation and event emission last, so a failure at any point leaves no
//! partial state.
//!
//! Timeouts are evaluated lazily. Nothing runs on a timer; whichever party
//! is incentivized to act calls `cancel_expired_room` or `claim_forfeit`
//! and the deadline comparison happens then.

pub mod clock;
pub mod events;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::ledger::{BalanceLedger, FeeContribution, PlayerBalance, Settlement};
use crate::protocol::{
    calculate_stake, rules, stakes, verify_commitment, AccountId, Hash256, Move, Room, RoomId,
    RoomState, RoundOutcome, Tier, TierMultipliers, Tokens, TOKEN_DECIMALS,
};
use crate::referral::ReferralRegistry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{EventRecord, GameEvent};

/// All authoritative state, guarded by a single lock
struct CoreState {
    rooms: HashMap<RoomId, Room>,
    next_room_id: RoomId,
    ledger: BalanceLedger,
    referrals: ReferralRegistry,
    event_log: Vec<EventRecord>,
}

impl CoreState {
    fn emit(&mut self, tx: &UnboundedSender<EventRecord>, now: u64, event: GameEvent) {
        let record = EventRecord {
            seq: self.event_log.len() as u64,
            timestamp: now,
            event,
        };
        self.event_log.push(record.clone());
        // live observers may be gone; the log is the durable source
        let _ = tx.send(record);
    }

    fn room(&self, room_id: RoomId) -> Result<&Room> {
        self.rooms.get(&room_id).ok_or(Error::RoomNotFound(room_id))
    }

    fn room_mut(&mut self, room_id: RoomId) -> Result<&mut Room> {
        self.rooms
            .get_mut(&room_id)
            .ok_or(Error::RoomNotFound(room_id))
    }
}

/// The escrow game service
///
/// Owns the room book, the balance ledger, and the referral registry.
/// Callers are identified by `AccountId`; authentication is the concern of
/// the wallet layer in front of this service.
pub struct GameService {
    state: RwLock<CoreState>,
    config: ProtocolConfig,
    clock: Arc<dyn Clock>,
    event_tx: UnboundedSender<EventRecord>,
}

impl GameService {
    /// Create a service on wall-clock time
    pub fn new(config: ProtocolConfig) -> Result<(Self, UnboundedReceiver<EventRecord>)> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a service with an explicit time source
    pub fn with_clock(
        config: ProtocolConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, UnboundedReceiver<EventRecord>)> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let service = Self {
            state: RwLock::new(CoreState {
                rooms: HashMap::new(),
                next_room_id: 1,
                ledger: BalanceLedger::new(),
                referrals: ReferralRegistry::new(),
                event_log: Vec::new(),
            }),
            config,
            clock,
            event_tx,
        };
        Ok((service, event_rx))
    }

    // --- balance operations -------------------------------------------------

    /// Credit an external deposit to the caller's free balance
    pub async fn deposit(&self, caller: AccountId, amount: Tokens) -> Result<()> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;
        state.ledger.deposit(caller, amount)?;
        state.emit(
            &self.event_tx,
            now,
            GameEvent::BalanceDeposited {
                player: caller,
                amount,
            },
        );
        Ok(())
    }

    /// Debit the caller's free balance; the actual wallet transfer is the
    /// submission layer's job, keyed off the emitted event
    pub async fn withdraw(&self, caller: AccountId, amount: Tokens) -> Result<()> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;
        state.ledger.withdraw(caller, amount)?;
        state.emit(
            &self.event_tx,
            now,
            GameEvent::BalanceWithdrawn {
                player: caller,
                amount,
            },
        );
        Ok(())
    }

    // --- referral -----------------------------------------------------------

    /// One-time, irreversible referrer binding for the caller
    pub async fn set_referrer(&self, caller: AccountId, referrer: AccountId) -> Result<()> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;
        state.referrals.set_referrer(caller, referrer)?;
        state.emit(
            &self.event_tx,
            now,
            GameEvent::ReferrerSet {
                player: caller,
                referrer,
            },
        );
        Ok(())
    }

    // --- room lifecycle -----------------------------------------------------

    /// Open a room: the caller becomes player A and locks the safety
    /// deposit (maximum possible stake plus collateral penalty)
    pub async fn create_room(
        &self,
        caller: AccountId,
        base_stake: Tokens,
        commit_hash: Hash256,
        tier: Tier,
    ) -> Result<RoomId> {
        if base_stake < self.config.min_base_stake() {
            return Err(Error::InvalidStake(format!(
                "base stake {} below minimum {}",
                base_stake,
                self.config.min_base_stake()
            )));
        }
        if base_stake.amount() % self.config.stake_unit != 0 {
            return Err(Error::InvalidStake(format!(
                "base stake {} is not a multiple of {}",
                base_stake,
                Tokens::new(self.config.stake_unit)
            )));
        }
        let penalty = stakes::collateral_penalty(
            base_stake,
            tier,
            self.config.fees.collateral_penalty_percent,
        )?;
        let deposit = stakes::safety_deposit(base_stake, tier, penalty)?;
        let max_stake = stakes::max_stake(base_stake, tier)?;

        let now = self.clock.now_unix();
        let mut state = self.state.write().await;
        state.ledger.lock(caller, deposit)?;

        let room_id = state.next_room_id;
        state.next_room_id += 1;
        let room = Room {
            room_id,
            player_a: caller,
            player_b: None,
            tier,
            base_stake,
            player_a_stake: None,
            player_b_stake: None,
            player_a_commit: commit_hash,
            player_a_move: None,
            player_b_move: None,
            reveal_deadline: None,
            expiration_time: now + self.config.timing.room_ttl_secs,
            collateral_penalty: penalty,
            state: RoomState::WaitingForPlayerB,
        };
        state.rooms.insert(room_id, room);
        state.emit(
            &self.event_tx,
            now,
            GameEvent::RoomCreated {
                room_id,
                player_a: caller,
                tier,
                base_stake,
                max_stake,
            },
        );
        info!(room_id, player_a = %hex::encode(caller), %base_stake, ?tier, "room created");
        Ok(room_id)
    }

    /// Join an open room: the caller becomes player B, staking on a
    /// cleartext move (player A's commitment is already locked in)
    pub async fn join_room(&self, caller: AccountId, room_id: RoomId, mv: Move) -> Result<()> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let room = state.room(room_id)?;
        if room.state != RoomState::WaitingForPlayerB {
            return Err(Error::RoomNotJoinable(format!(
                "room {} is in state {:?}",
                room_id, room.state
            )));
        }
        // joining exactly at the expiration instant is already too late
        if now >= room.expiration_time {
            return Err(Error::RoomNotJoinable(format!(
                "room {} expired at {}",
                room_id, room.expiration_time
            )));
        }
        if room.player_a == caller {
            return Err(Error::SelfJoinForbidden);
        }
        let stake = calculate_stake(room.base_stake, mv, room.tier)?;

        state.ledger.lock(caller, stake)?;

        let deadline = now + self.config.timing.reveal_window_secs;
        let room = state.room_mut(room_id)?;
        room.player_b = Some(caller);
        room.player_b_move = Some(mv);
        room.player_b_stake = Some(stake);
        room.reveal_deadline = Some(deadline);
        room.state = RoomState::WaitingForReveal;

        state.emit(
            &self.event_tx,
            now,
            GameEvent::PlayerJoined {
                room_id,
                player_b: caller,
                mv,
                stake,
            },
        );
        info!(room_id, player_b = %hex::encode(caller), ?mv, %stake, "player joined");
        Ok(())
    }

    /// Reveal player A's committed move and settle the round
    ///
    /// Returns the winner, or `None` for a draw.
    pub async fn reveal_move(
        &self,
        caller: AccountId,
        room_id: RoomId,
        mv: Move,
        salt: &[u8],
    ) -> Result<Option<AccountId>> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let room = state.room(room_id)?.clone();
        if room.state != RoomState::WaitingForReveal {
            return Err(Error::InvalidRoomState(format!(
                "room {} is in state {:?}, not awaiting reveal",
                room_id, room.state
            )));
        }
        if room.player_a != caller {
            return Err(Error::Unauthorized(
                "only the room creator can reveal".into(),
            ));
        }
        // the deadline instant itself is still valid for revealing
        let deadline = room.reveal_deadline.unwrap_or(0);
        if now > deadline {
            return Err(Error::RevealExpired { deadline, now });
        }
        if !verify_commitment(&room.player_a_commit, mv, salt) {
            warn!(room_id, "reveal rejected: commitment mismatch");
            return Err(Error::CommitMismatch);
        }

        let player_b = room
            .player_b
            .ok_or_else(|| Error::InvalidRoomState("no opponent".into()))?;
        let move_b = room
            .player_b_move
            .ok_or_else(|| Error::InvalidRoomState("no opponent move".into()))?;
        let stake_b = room
            .player_b_stake
            .ok_or_else(|| Error::InvalidRoomState("no opponent stake".into()))?;

        let stake_a = calculate_stake(room.base_stake, mv, room.tier)?;
        let deposit_a = room.safety_deposit()?;
        let fee_pct = self.config.fees.platform_fee_percent;
        let fee_a = stake_a.percent(fee_pct);
        let fee_b = stake_b.percent(fee_pct);
        let pot_after_fees = stake_a
            .checked_add(stake_b)?
            .checked_sub(fee_a)?
            .checked_sub(fee_b)?;
        // collateral and the unused share of the deposit go back to A
        let deposit_refund = deposit_a.checked_sub(stake_a)?;

        let outcome = rules::resolve(mv, move_b);
        let (winner, winnings, settlement) = match outcome {
            RoundOutcome::PlayerA => (
                Some(room.player_a),
                pot_after_fees,
                Settlement {
                    debits: vec![(room.player_a, deposit_a), (player_b, stake_b)],
                    credits: vec![(room.player_a, deposit_refund.checked_add(pot_after_fees)?)],
                    fees: vec![
                        FeeContribution {
                            payer: room.player_a,
                            amount: fee_a,
                        },
                        FeeContribution {
                            payer: player_b,
                            amount: fee_b,
                        },
                    ],
                },
            ),
            RoundOutcome::PlayerB => (
                Some(player_b),
                pot_after_fees,
                Settlement {
                    debits: vec![(room.player_a, deposit_a), (player_b, stake_b)],
                    credits: vec![
                        (room.player_a, deposit_refund),
                        (player_b, pot_after_fees),
                    ],
                    fees: vec![
                        FeeContribution {
                            payer: room.player_a,
                            amount: fee_a,
                        },
                        FeeContribution {
                            payer: player_b,
                            amount: fee_b,
                        },
                    ],
                },
            ),
            RoundOutcome::Draw => (
                None,
                Tokens::ZERO,
                Settlement {
                    debits: vec![(room.player_a, deposit_a), (player_b, stake_b)],
                    credits: vec![
                        (room.player_a, deposit_a.checked_sub(fee_a)?),
                        (player_b, stake_b.checked_sub(fee_b)?),
                    ],
                    fees: vec![
                        FeeContribution {
                            payer: room.player_a,
                            amount: fee_a,
                        },
                        FeeContribution {
                            payer: player_b,
                            amount: fee_b,
                        },
                    ],
                },
            ),
        };

        let referrals = state.referrals.clone();
        let receipt = state.ledger.settle(
            &settlement,
            &referrals,
            &self.config.fees,
            self.config.fee_recipient,
        )?;

        let stored = state.room_mut(room_id)?;
        stored.player_a_move = Some(mv);
        stored.player_a_stake = Some(stake_a);
        stored.state = RoomState::Completed;

        state.emit(
            &self.event_tx,
            now,
            GameEvent::GameRevealed {
                room_id,
                player_a: room.player_a,
                player_b,
                player_a_move: mv,
                player_b_move: move_b,
                winner,
                winnings,
            },
        );
        self.emit_fee_events(&mut state, now, room_id, receipt);
        info!(room_id, ?outcome, %winnings, "game revealed");
        Ok(winner)
    }

    /// Close an expired, never-joined room and return the deposit
    ///
    /// Permissionless: funds can only flow back to player A, so any caller
    /// may trigger the cleanup.
    pub async fn cancel_expired_room(&self, caller: AccountId, room_id: RoomId) -> Result<()> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let room = state.room(room_id)?.clone();
        if room.state != RoomState::WaitingForPlayerB {
            return Err(Error::InvalidRoomState(format!(
                "room {} is in state {:?}, not cancellable",
                room_id, room.state
            )));
        }
        if now < room.expiration_time {
            return Err(Error::RoomNotExpired {
                expires_at: room.expiration_time,
                now,
            });
        }
        let deposit = room.safety_deposit()?;
        let settlement = Settlement {
            debits: vec![(room.player_a, deposit)],
            credits: vec![(room.player_a, deposit)],
            fees: vec![],
        };
        let referrals = state.referrals.clone();
        state.ledger.settle(
            &settlement,
            &referrals,
            &self.config.fees,
            self.config.fee_recipient,
        )?;

        state.room_mut(room_id)?.state = RoomState::Forfeited;
        state.emit(
            &self.event_tx,
            now,
            GameEvent::GameForfeited {
                room_id,
                player_a: room.player_a,
                player_b: None,
                compensation: deposit,
                penalty: Tokens::ZERO,
            },
        );
        info!(room_id, caller = %hex::encode(caller), "expired room cancelled");
        Ok(())
    }

    /// Claim a win by default after player A missed the reveal deadline
    ///
    /// Player B recovers their own stake and receives player A's entire
    /// safety deposit (collateral penalty included) minus the platform
    /// fee. Returns the compensation credited.
    pub async fn claim_forfeit(&self, caller: AccountId, room_id: RoomId) -> Result<Tokens> {
        let now = self.clock.now_unix();
        let mut state = self.state.write().await;

        let room = state.room(room_id)?.clone();
        if room.state != RoomState::WaitingForReveal {
            return Err(Error::ForfeitNotClaimable(format!(
                "room {} is in state {:?}",
                room_id, room.state
            )));
        }
        let player_b = room
            .player_b
            .ok_or_else(|| Error::ForfeitNotClaimable("no opponent".into()))?;
        if caller != player_b {
            return Err(Error::Unauthorized(
                "only the joined opponent can claim a forfeit".into(),
            ));
        }
        let deadline = room.reveal_deadline.unwrap_or(0);
        // at the deadline instant a reveal is still valid, so the claim
        // only opens strictly after it
        if now <= deadline {
            return Err(Error::ForfeitNotClaimable(format!(
                "reveal window open until {}",
                deadline
            )));
        }
        let stake_b = room
            .player_b_stake
            .ok_or_else(|| Error::ForfeitNotClaimable("no opponent stake".into()))?;
        let deposit_a = room.safety_deposit()?;
        // fee is charged on the transferred deposit; B's own stake returns whole
        let fee = deposit_a.percent(self.config.fees.platform_fee_percent);
        let compensation = stake_b.checked_add(deposit_a)?.checked_sub(fee)?;

        let settlement = Settlement {
            debits: vec![(room.player_a, deposit_a), (player_b, stake_b)],
            credits: vec![(player_b, compensation)],
            fees: vec![FeeContribution {
                payer: room.player_a,
                amount: fee,
            }],
        };
        let referrals = state.referrals.clone();
        let receipt = state.ledger.settle(
            &settlement,
            &referrals,
            &self.config.fees,
            self.config.fee_recipient,
        )?;

        state.room_mut(room_id)?.state = RoomState::Forfeited;
        state.emit(
            &self.event_tx,
            now,
            GameEvent::GameForfeited {
                room_id,
                player_a: room.player_a,
                player_b: Some(player_b),
                compensation,
                penalty: room.collateral_penalty,
            },
        );
        self.emit_fee_events(&mut state, now, room_id, receipt);
        info!(room_id, %compensation, "forfeit claimed");
        Ok(compensation)
    }

    fn emit_fee_events(
        &self,
        state: &mut CoreState,
        now: u64,
        room_id: RoomId,
        receipt: crate::ledger::SettlementReceipt,
    ) {
        for (_, referrer, amount) in receipt.referral_payouts {
            state.emit(
                &self.event_tx,
                now,
                GameEvent::ReferralFeeDistributed {
                    room_id,
                    referrer,
                    amount,
                },
            );
        }
        if !receipt.platform_fee.is_zero() {
            state.emit(
                &self.event_tx,
                now,
                GameEvent::PlatformFeeCollected {
                    room_id,
                    amount: receipt.platform_fee,
                },
            );
        }
    }

    // --- queries ------------------------------------------------------------

    pub async fn get_room(&self, room_id: RoomId) -> Option<Room> {
        self.state.read().await.rooms.get(&room_id).cloned()
    }

    pub async fn get_room_state(&self, room_id: RoomId) -> Result<RoomState> {
        Ok(self.state.read().await.room(room_id)?.state)
    }

    /// Rooms currently open for joining
    pub async fn get_available_rooms(&self) -> Vec<Room> {
        let now = self.clock.now_unix();
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|r| r.state == RoomState::WaitingForPlayerB && now < r.expiration_time)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }

    /// Non-terminal rooms the player is a party to
    pub async fn get_player_active_rooms(&self, player: AccountId) -> Vec<Room> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|r| {
                !r.state.is_terminal() && (r.player_a == player || r.player_b == Some(player))
            })
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }

    pub async fn get_player_balance(&self, player: AccountId) -> PlayerBalance {
        self.state.read().await.ledger.balance(&player)
    }

    pub async fn get_referrer(&self, player: AccountId) -> Option<AccountId> {
        self.state.read().await.referrals.get_referrer(&player)
    }

    pub async fn get_room_count(&self) -> u64 {
        self.state.read().await.rooms.len() as u64
    }

    /// Full event log; history views project over this
    pub async fn events(&self) -> Vec<EventRecord> {
        self.state.read().await.event_log.clone()
    }

    /// Events concerning one room, in emission order
    pub async fn room_history(&self, room_id: RoomId) -> Vec<EventRecord> {
        self.state
            .read()
            .await
            .event_log
            .iter()
            .filter(|r| r.event.room_id() == Some(room_id))
            .cloned()
            .collect()
    }

    /// Events directly involving one player, in emission order
    pub async fn player_history(&self, player: AccountId) -> Vec<EventRecord> {
        self.state
            .read()
            .await
            .event_log
            .iter()
            .filter(|r| r.event.participants().contains(&player))
            .cloned()
            .collect()
    }

    pub fn min_base_stake(&self) -> Tokens {
        self.config.min_base_stake()
    }

    pub fn token_decimals(&self) -> u32 {
        TOKEN_DECIMALS
    }

    pub fn get_tier_multipliers(&self, tier: Tier) -> TierMultipliers {
        TierMultipliers::for_tier(tier)
    }

    /// Required stake for a move at a tier (pure helper, also exported at
    /// the crate root)
    pub fn calculate_stake(&self, base_stake: Tokens, mv: Move, tier: Tier) -> Result<Tokens> {
        calculate_stake(base_stake, mv, tier)
    }
}
