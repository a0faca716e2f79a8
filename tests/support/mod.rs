//! Shared banking fixtures for the integration tests.
//!
//! A small transfer domain: a command that requests a transfer, the event
//! published when one is created, repositories the handlers write to, and
//! a few instrumented handlers for asserting delivery behavior.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use microbus::{
    Command, CommandHandler, Event, EventBus, EventHandler, HandlerError, InMemoryBroker, Message,
};

// ============================================================================
// Messages
// ============================================================================

/// Request to move money between two accounts.
#[derive(Clone, Debug)]
pub struct CreateTransferCommand {
    pub from: u32,
    pub to: u32,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CreateTransferCommand {
    pub fn new(from: u32, to: u32, amount: Decimal) -> Self {
        Self {
            from,
            to,
            amount,
            created_at: Utc::now(),
        }
    }
}

impl Message for CreateTransferCommand {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Command for CreateTransferCommand {}

/// Fact: a transfer was accepted and published for downstream services.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferCreatedEvent {
    pub from: u32,
    pub to: u32,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TransferCreatedEvent {
    pub fn new(from: u32, to: u32, amount: Decimal) -> Self {
        Self {
            from,
            to,
            amount,
            created_at: Utc::now(),
        }
    }
}

impl Message for TransferCreatedEvent {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Event for TransferCreatedEvent {
    fn kind() -> &'static str {
        "TransferCreatedEvent"
    }
}

// ============================================================================
// Models and repositories
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: u32,
    pub account_type: String,
    pub balance: Decimal,
}

/// In-memory account store (the banking side's read surface).
#[derive(Clone, Default)]
pub struct AccountRepository {
    accounts: Arc<RwLock<Vec<Account>>>,
}

impl AccountRepository {
    pub fn add(&self, account: Account) {
        self.accounts.write().unwrap().push(account);
    }

    pub fn get_accounts(&self) -> Vec<Account> {
        self.accounts.read().unwrap().clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransferLog {
    pub from_account: u32,
    pub to_account: u32,
    pub amount: Decimal,
}

/// In-memory transfer log store (the transfer side's write surface).
#[derive(Clone, Default)]
pub struct TransferRepository {
    logs: Arc<RwLock<Vec<TransferLog>>>,
}

impl TransferRepository {
    pub fn add(&self, log: TransferLog) {
        self.logs.write().unwrap().push(log);
    }

    pub fn get_transfer_logs(&self) -> Vec<TransferLog> {
        self.logs.read().unwrap().clone()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Handles the transfer command by publishing `TransferCreatedEvent`.
///
/// A publish failure fails the command; the caller of `send_command` sees
/// it synchronously.
pub struct TransferCommandHandler {
    bus: Arc<EventBus<InMemoryBroker>>,
}

impl TransferCommandHandler {
    pub fn new(bus: Arc<EventBus<InMemoryBroker>>) -> Self {
        Self { bus }
    }
}

impl CommandHandler<CreateTransferCommand> for TransferCommandHandler {
    fn handle(&self, command: CreateTransferCommand) -> Result<bool, HandlerError> {
        self.bus.publish(&TransferCreatedEvent::new(
            command.from,
            command.to,
            command.amount,
        ))?;
        Ok(true)
    }
}

/// Consumes transfer events and appends them to the transfer log.
pub struct TransferEventHandler {
    transfers: TransferRepository,
}

impl TransferEventHandler {
    pub fn new(transfers: TransferRepository) -> Self {
        Self { transfers }
    }
}

impl EventHandler<TransferCreatedEvent> for TransferEventHandler {
    fn handle(&self, event: &TransferCreatedEvent) -> Result<(), HandlerError> {
        self.transfers.add(TransferLog {
            from_account: event.from,
            to_account: event.to,
            amount: event.amount,
        });
        Ok(())
    }
}

/// Records every event it observes, for assertions.
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<TransferCreatedEvent>>>,
}

impl RecordingHandler {
    pub fn new(calls: Arc<Mutex<Vec<TransferCreatedEvent>>>) -> Self {
        Self { calls }
    }
}

impl EventHandler<TransferCreatedEvent> for RecordingHandler {
    fn handle(&self, event: &TransferCreatedEvent) -> Result<(), HandlerError> {
        self.calls.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Blocks on a gate before recording, to prove publish does not wait.
pub struct GatedHandler {
    gate: Arc<Mutex<Receiver<()>>>,
    calls: Arc<Mutex<Vec<TransferCreatedEvent>>>,
}

impl GatedHandler {
    pub fn new(gate: Arc<Mutex<Receiver<()>>>, calls: Arc<Mutex<Vec<TransferCreatedEvent>>>) -> Self {
        Self { gate, calls }
    }
}

impl EventHandler<TransferCreatedEvent> for GatedHandler {
    fn handle(&self, event: &TransferCreatedEvent) -> Result<(), HandlerError> {
        // Hold the delivery until the test opens the gate.
        let _ = self.gate.lock().unwrap().recv();
        self.calls.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Subscribed but never registered with the scope factory; deliveries
/// must skip it silently.
pub struct UnresolvableHandler;

impl EventHandler<TransferCreatedEvent> for UnresolvableHandler {
    fn handle(&self, _event: &TransferCreatedEvent) -> Result<(), HandlerError> {
        panic!("this handler can never be resolved");
    }
}
