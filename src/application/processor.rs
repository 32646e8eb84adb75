use crate::application::poller::Poller;
use crate::config::ProcessorConfig;
use crate::domain::account::AccountId;
use crate::domain::balance::{BalanceCache, BalanceEntry};
use crate::domain::fee;
use crate::domain::ledger::{BlockedFunds, ReservationId, ReservationLedger};
use crate::domain::money::{Currency, FiatAmount};
use crate::domain::payment::{Payment, PaymentId, PaymentRequest};
use crate::domain::ports::SharedGateway;
use crate::error::{GatewayError, PaymentError, Result};
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Emitted to subscribers every time a cached balance changes.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChanged {
    pub entry: BalanceEntry,
}

enum Request {
    RetrieveAccountId {
        reply: oneshot::Sender<AccountId>,
    },
    RetrieveBalance {
        currency: Currency,
        reply: oneshot::Sender<Result<BalanceEntry>>,
    },
    Balances {
        reply: oneshot::Sender<Vec<BalanceEntry>>,
    },
    BlockFunds {
        amount: FiatAmount,
        reply: oneshot::Sender<Result<BlockedFunds>>,
    },
    ReleaseFunds {
        id: ReservationId,
        reply: oneshot::Sender<Option<FiatAmount>>,
    },
    Pay {
        request: PaymentRequest,
        reply: oneshot::Sender<Result<Payment>>,
    },
    FindPayment {
        payment_id: PaymentId,
        reply: oneshot::Sender<Result<Payment>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Results of gateway calls, fed back into the processor task.
enum Completion {
    Poll(std::result::Result<Vec<FiatAmount>, GatewayError>),
    BalanceFetched {
        currency: Currency,
        result: std::result::Result<Vec<FiatAmount>, GatewayError>,
        reply: oneshot::Sender<Result<BalanceEntry>>,
    },
    PaymentSent {
        request: PaymentRequest,
        result: std::result::Result<Payment, GatewayError>,
        reply: oneshot::Sender<Result<Payment>>,
    },
    PaymentLookedUp {
        payment_id: PaymentId,
        result: std::result::Result<Option<Payment>, GatewayError>,
        reply: oneshot::Sender<Result<Payment>>,
    },
}

/// Single owner of the reservation ledger and the balance cache.
///
/// The processor runs as one tokio task and handles caller requests, poll
/// ticks and gateway completions strictly one at a time; whichever
/// `block_funds` is handled first gets the headroom. Gateway calls run on
/// their own tasks and report back through an internal channel.
pub struct PaymentProcessor {
    account_id: AccountId,
    gateway: SharedGateway,
    ledger: ReservationLedger,
    cache: BalanceCache,
    poller: Poller,
    /// Set once a scheduled poll has succeeded. From then on the cache is
    /// authoritative and unknown currencies are not fetched one by one.
    polled: bool,
    inbox: mpsc::Receiver<Request>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    notifications: broadcast::Sender<BalanceChanged>,
}

impl PaymentProcessor {
    /// Fetches the initial balances and spawns the processor task.
    ///
    /// Fails with [`PaymentError::StartFailed`] if the gateway cannot be
    /// reached, in which case nothing is spawned.
    pub async fn start(config: ProcessorConfig, gateway: SharedGateway) -> Result<ProcessorHandle> {
        config.validate()?;
        let ProcessorConfig {
            account_id,
            polling_interval,
            inbox_capacity,
            notification_capacity,
        } = config;

        let balances = match gateway.fetch_balances().await {
            Ok(balances) => balances,
            Err(cause) => {
                warn!(account = %account_id, %cause, "Initial balance fetch failed");
                return Err(PaymentError::StartFailed { account_id, cause });
            }
        };
        let mut cache = BalanceCache::new();
        cache.apply(balances);

        let (requests, inbox) = mpsc::channel(inbox_capacity);
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(notification_capacity);

        info!(
            account = %account_id,
            currencies = cache.entries().len(),
            ?polling_interval,
            "Payment processor started"
        );

        let processor = Self {
            account_id,
            gateway,
            ledger: ReservationLedger::new(),
            cache,
            poller: Poller::new(polling_interval),
            polled: false,
            inbox,
            completions,
            completion_tx,
            notifications: notifications.clone(),
        };
        tokio::spawn(processor.run());

        Ok(ProcessorHandle {
            requests,
            notifications,
        })
    }

    async fn run(mut self) {
        let stop_ack = loop {
            tokio::select! {
                biased;
                Some(completion) = self.completions.recv() => self.on_completion(completion),
                request = self.inbox.recv() => match request {
                    Some(request) => {
                        if let ControlFlow::Break(ack) = self.on_request(request) {
                            break Some(ack);
                        }
                    }
                    None => break None,
                },
                _ = self.poller.tick() => self.start_poll(),
            }
        };

        // Late gateway replies and queued requests are dropped from here on.
        self.inbox.close();
        self.completions.close();
        info!(
            account = %self.account_id,
            live_reservations = self.ledger.len(),
            exhausted_reservations = self.ledger.exhausted_len(),
            "Payment processor stopped"
        );
        if let Some(ack) = stop_ack {
            let _ = ack.send(());
        }
    }

    fn on_request(&mut self, request: Request) -> ControlFlow<oneshot::Sender<()>> {
        match request {
            Request::RetrieveAccountId { reply } => {
                let _ = reply.send(self.account_id.clone());
            }
            Request::RetrieveBalance { currency, reply } => self.retrieve_balance(currency, reply),
            Request::Balances { reply } => {
                let _ = reply.send(self.cache.entries());
            }
            Request::BlockFunds { amount, reply } => {
                let _ = reply.send(self.block_funds(amount));
            }
            Request::ReleaseFunds { id, reply } => {
                let _ = reply.send(self.release_funds(id));
            }
            Request::Pay { request, reply } => self.pay(request, reply),
            Request::FindPayment { payment_id, reply } => self.find_payment(payment_id, reply),
            Request::Stop { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    fn retrieve_balance(&mut self, currency: Currency, reply: oneshot::Sender<Result<BalanceEntry>>) {
        if self.polled || self.cache.contains(&currency) {
            let _ = reply.send(Ok(self.cache.read(&currency)));
            return;
        }

        debug!(%currency, "Balance not cached before the first poll, asking the gateway");
        let gateway = Arc::clone(&self.gateway);
        self.spawn_call(
            async move { gateway.fetch_balances().await },
            move |result| Completion::BalanceFetched {
                currency,
                result,
                reply,
            },
        );
    }

    fn block_funds(&mut self, amount: FiatAmount) -> Result<BlockedFunds> {
        let balance = self.cache.read(&amount.currency);
        let blocked = self
            .ledger
            .reserve(amount, &balance.amount)
            .inspect_err(|err| debug!(%err, "Cannot block funds"))?;
        debug!(
            id = %blocked.id,
            amount = %blocked.amount,
            available = %blocked.available_after,
            stale = balance.stale,
            "Funds blocked"
        );
        Ok(blocked)
    }

    fn release_funds(&mut self, id: ReservationId) -> Option<FiatAmount> {
        let released = self.ledger.release(id);
        debug!(%id, ?released, "Reservation released");
        released
    }

    fn pay(&mut self, request: PaymentRequest, reply: oneshot::Sender<Result<Payment>>) {
        if let Err(cause) = self.consume_reservation(&request) {
            debug!(%request, %cause, "Payment rejected before reaching the gateway");
            let _ = reply.send(Err(PaymentError::PaymentFailed {
                request: Box::new(request),
                cause: Box::new(cause),
            }));
            return;
        }

        // The consumed amount is not given back if the gateway fails: the next
        // poll reconciles the balance with whatever the gateway really did.
        let gateway = Arc::clone(&self.gateway);
        let (receiver, amount, description) = (
            request.receiver_id.clone(),
            request.amount.clone(),
            request.description.clone(),
        );
        self.spawn_call(
            async move {
                gateway
                    .send_payment(&receiver, &amount, &description)
                    .await
            },
            move |result| Completion::PaymentSent {
                request,
                result,
                reply,
            },
        );
    }

    /// Takes the payment amount plus the gateway fee out of the reservation.
    fn consume_reservation(&mut self, request: &PaymentRequest) -> Result<FiatAmount> {
        request.amount.ensure_positive()?;
        let total = fee::amount_plus_fee(&request.amount)?;
        let remaining = self.ledger.consume(request.reservation_id, &total)?;
        debug!(
            reservation = %request.reservation_id,
            %total,
            %remaining,
            "Reserved funds consumed"
        );
        Ok(remaining)
    }

    fn find_payment(&self, payment_id: PaymentId, reply: oneshot::Sender<Result<Payment>>) {
        let gateway = Arc::clone(&self.gateway);
        let id = payment_id.clone();
        self.spawn_call(
            async move { gateway.find_payment(&id).await },
            move |result| Completion::PaymentLookedUp {
                payment_id,
                result,
                reply,
            },
        );
    }

    fn start_poll(&mut self) {
        if !self.poller.try_begin() {
            debug!("Previous balance poll still in flight, skipping tick");
            return;
        }
        let gateway = Arc::clone(&self.gateway);
        self.spawn_call(async move { gateway.fetch_balances().await }, Completion::Poll);
    }

    /// Runs a gateway call on its own task and feeds `complete(result)` back
    /// to the processor. A call that panics completes with a [`GatewayError`],
    /// so the reply and the poll slot are never lost.
    fn spawn_call<T, F, C>(&self, call: F, complete: C)
    where
        T: Send + 'static,
        F: Future<Output = std::result::Result<T, GatewayError>> + Send + 'static,
        C: FnOnce(std::result::Result<T, GatewayError>) -> Completion + Send + 'static,
    {
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(call).await {
                Ok(result) => result,
                Err(err) => {
                    error!(%err, "Gateway call aborted");
                    Err(GatewayError::new(format!("gateway call aborted: {err}")))
                }
            };
            if completions.send(complete(result)).is_err() {
                debug!("Processor stopped, discarding gateway reply");
            }
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Poll(Ok(balances)) => {
                self.poller.finish();
                self.polled = true;
                let changed = self.cache.apply(balances);
                debug!(changed = changed.len(), "Balance poll completed");
                self.notify(changed);
            }
            Completion::Poll(Err(cause)) => {
                self.poller.finish();
                warn!(%cause, "Balance poll failed, cached balances marked stale");
                let changed = self.cache.mark_all_stale();
                self.notify(changed);
            }
            Completion::BalanceFetched {
                currency,
                result,
                reply,
            } => {
                // Answered from the fetch alone: only polls update the cache.
                let response = match result {
                    Ok(balances) => Ok(balances
                        .into_iter()
                        .find(|amount| amount.currency == currency)
                        .map(|amount| BalanceEntry {
                            amount,
                            stale: false,
                        })
                        .unwrap_or_else(|| BalanceEntry::unknown(currency))),
                    Err(cause) => {
                        warn!(%currency, %cause, "Balance retrieval failed");
                        Err(PaymentError::BalanceRetrievalFailed { currency, cause })
                    }
                };
                let _ = reply.send(response);
            }
            Completion::PaymentSent {
                request,
                result,
                reply,
            } => {
                let response = match result {
                    Ok(payment) => {
                        info!(
                            payment = %payment.id,
                            amount = %payment.amount,
                            receiver = %payment.receiver_id,
                            "Payment sent"
                        );
                        Ok(payment)
                    }
                    Err(cause) => {
                        warn!(%request, %cause, "Gateway rejected payment");
                        Err(PaymentError::PaymentFailed {
                            request: Box::new(request),
                            cause: Box::new(PaymentError::Gateway(cause)),
                        })
                    }
                };
                let _ = reply.send(response);
            }
            Completion::PaymentLookedUp {
                payment_id,
                result,
                reply,
            } => {
                let response = match result {
                    Ok(Some(payment)) => Ok(payment),
                    Ok(None) => Err(PaymentError::PaymentNotFound(payment_id)),
                    Err(cause) => {
                        warn!(payment = %payment_id, %cause, "Payment lookup failed");
                        Err(PaymentError::FindPaymentFailed { payment_id, cause })
                    }
                };
                let _ = reply.send(response);
            }
        }
    }

    fn notify(&self, changed: Vec<BalanceEntry>) {
        for entry in changed {
            // Having no subscriber is not an error.
            let _ = self.notifications.send(BalanceChanged { entry });
        }
    }
}

/// Cloneable handle to a running [`PaymentProcessor`].
///
/// Every method fails with [`PaymentError::ProcessorStopped`] once the
/// processor has stopped. The processor also stops when the last handle is
/// dropped.
#[derive(Clone)]
pub struct ProcessorHandle {
    requests: mpsc::Sender<Request>,
    notifications: broadcast::Sender<BalanceChanged>,
}

impl ProcessorHandle {
    async fn call<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(request(reply))
            .await
            .map_err(|_| PaymentError::ProcessorStopped)?;
        response.await.map_err(|_| PaymentError::ProcessorStopped)
    }

    pub async fn retrieve_account_id(&self) -> Result<AccountId> {
        self.call(|reply| Request::RetrieveAccountId { reply }).await
    }

    /// Cached balance for `currency`.
    ///
    /// Until the first scheduled poll succeeds, a currency missing from the
    /// cache is looked up with a one-off gateway fetch. Afterwards it reads as
    /// zero and stale.
    pub async fn retrieve_balance(&self, currency: Currency) -> Result<BalanceEntry> {
        self.call(|reply| Request::RetrieveBalance { currency, reply })
            .await?
    }

    /// Snapshot of every cached balance.
    pub async fn balances(&self) -> Result<Vec<BalanceEntry>> {
        self.call(|reply| Request::Balances { reply }).await
    }

    pub async fn block_funds(&self, amount: FiatAmount) -> Result<BlockedFunds> {
        self.call(|reply| Request::BlockFunds { amount, reply })
            .await?
    }

    pub async fn release_funds(&self, id: ReservationId) -> Result<Option<FiatAmount>> {
        self.call(|reply| Request::ReleaseFunds { id, reply }).await
    }

    /// Pays `amount` to `receiver_id` out of reservation `reservation_id`.
    ///
    /// The reservation must cover `amount` plus the gateway fee.
    pub async fn pay(
        &self,
        reservation_id: ReservationId,
        receiver_id: AccountId,
        amount: FiatAmount,
        description: impl Into<String>,
    ) -> Result<Payment> {
        let request = PaymentRequest {
            reservation_id,
            receiver_id,
            amount,
            description: description.into(),
        };
        self.call(|reply| Request::Pay { request, reply }).await?
    }

    pub async fn find_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        self.call(|reply| Request::FindPayment { payment_id, reply })
            .await?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BalanceChanged> {
        self.notifications.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Stops the processor and waits until it no longer handles anything.
    pub async fn stop(&self) -> Result<()> {
        self.call(|reply| Request::Stop { reply }).await
    }
}
