//! Mock payment provider for testing.
//!
//! Returns deterministic intents, sessions, accounts and onboarding links,
//! records every request, and can be told to fail the next call.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, ConnectedAccount, CreateCheckoutRequest, CreateConnectedAccountRequest,
    CreateOnboardingLinkRequest, CreatePaymentIntentRequest, OnboardingLink, PaymentError,
    PaymentIntent, PaymentProvider,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.fail_next(PaymentError::network("connection reset"));
/// assert!(mock.create_payment_intent(request).await.is_err());
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    next_error: Option<PaymentError>,
    intents: Vec<CreatePaymentIntentRequest>,
    checkouts: Vec<CreateCheckoutRequest>,
    accounts: Vec<CreateConnectedAccountRequest>,
    onboarding_links: Vec<CreateOnboardingLinkRequest>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Fail the next call (of any kind) with the given error.
    pub fn fail_next(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Payment intent requests received so far.
    pub fn payment_intents(&self) -> Vec<CreatePaymentIntentRequest> {
        self.state().intents.clone()
    }

    /// Checkout session requests received so far.
    pub fn checkouts(&self) -> Vec<CreateCheckoutRequest> {
        self.state().checkouts.clone()
    }

    /// Connected account requests received so far.
    pub fn connected_accounts(&self) -> Vec<CreateConnectedAccountRequest> {
        self.state().accounts.clone()
    }

    /// Onboarding link requests received so far.
    pub fn onboarding_links(&self) -> Vec<CreateOnboardingLinkRequest> {
        self.state().onboarding_links.clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        state.intents.push(request);
        let n = state.intents.len();

        Ok(PaymentIntent {
            id: format!("pi_mock_{}", n),
            client_secret: format!("pi_mock_{}_secret", n),
        })
    }

    async fn create_subscription_checkout(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        state.checkouts.push(request);
        let n = state.checkouts.len();

        Ok(CheckoutSession {
            id: format!("cs_mock_{}", n),
            url: format!("https://checkout.stripe.test/cs_mock_{}", n),
        })
    }

    async fn create_connected_account(
        &self,
        request: CreateConnectedAccountRequest,
    ) -> Result<ConnectedAccount, PaymentError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        state.accounts.push(request);

        Ok(ConnectedAccount {
            id: format!("acct_mock_{}", state.accounts.len()),
        })
    }

    async fn create_onboarding_link(
        &self,
        request: CreateOnboardingLinkRequest,
    ) -> Result<OnboardingLink, PaymentError> {
        let mut state = self.state();
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        let url = format!("https://connect.stripe.test/setup/{}", request.account_id);
        state.onboarding_links.push(request);

        Ok(OnboardingLink { url })
    }
}
