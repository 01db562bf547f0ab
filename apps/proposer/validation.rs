use crate::store::ProposalDraft;
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;
use tokio::{sync::oneshot, task::JoinHandle, time::sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldError {
    #[error("is required")]
    Required,
    #[error("invalid address")]
    InvalidAddress,
    #[error("must be a whole number between 0 and 100, and above 0 for non-admins")]
    OutOfRange,
    #[error("must be in future")]
    DateNotInFuture,
    #[error("the founder must be the connected wallet")]
    NotFounder,
    #[error("allocation addresses should be unique")]
    DuplicateAllocation,
}

/// Field-indexed validation outcome, keyed the way the form renders errors,
/// e.g. `founder_allocation[1].founder_address`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, FieldError>,
}

impl ValidationErrors {
    pub fn insert(&mut self, field: impl Into<String>, error: FieldError) {
        self.fields.entry(field.into()).or_insert(error);
    }

    pub fn get(&self, field: &str) -> Option<FieldError> {
        self.fields.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldError)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, error) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field} {error}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// When an empty summary is acceptable. The platform's forms were not
/// consistent about this, so the rule is configuration rather than a guess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryRule {
    #[default]
    Required,
    /// Required only when the draft carries transactions.
    RequiredWithTransactions,
    Optional,
}

/// Structural checks on the proposal draft. Pure; no network contact.
pub fn validate_proposal(
    draft: &ProposalDraft,
    summary_rule: SummaryRule,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if draft.title.trim().is_empty() {
        errors.insert("title", FieldError::Required);
    }

    let summary_required = match summary_rule {
        SummaryRule::Required => true,
        SummaryRule::RequiredWithTransactions => !draft.transactions.is_empty(),
        SummaryRule::Optional => false,
    };
    if summary_required && draft.summary.trim().is_empty() {
        errors.insert("summary", FieldError::Required);
    }

    if draft.transactions.is_empty() {
        errors.insert("transactions", FieldError::Required);
    }

    errors.into_result()
}

/// One row of the founder allocation form. The address is kept raw because
/// it may be a name-service alias rather than hex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderAllocation {
    pub founder_address: String,
    pub allocation_percentage: i64,
    /// RFC 3339 timestamp at which the allocation vests away.
    pub end_date: String,
    #[serde(default)]
    pub admin: bool,
}

/// Resolves a human-readable alias to an address. `None` means
/// "not resolvable" and is never a hard error.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Option<Address>;
}

/// Hex parse first, alias lookup second.
pub async fn resolve_address<R: AddressResolver + ?Sized>(
    raw: &str,
    resolver: &R,
) -> Option<Address> {
    let raw = raw.trim();
    if let Ok(address) = Address::from_str(raw) {
        return Some(address);
    }
    resolver.resolve(raw).await
}

/// Founder-list rules: every address valid (format or resolvable alias),
/// percentages integral in 0..=100 (> 0 for non-admins), dates strictly in
/// the future, first entry owned by the connected signer, no duplicates.
pub async fn validate_founder_allocations<R: AddressResolver + ?Sized>(
    entries: &[FounderAllocation],
    signer: Address,
    resolver: &R,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if entries.is_empty() {
        errors.insert("founder_allocation", FieldError::Required);
        return errors.into_result();
    }

    let mut resolved: Vec<Option<Address>> = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let address = resolve_address(&entry.founder_address, resolver).await;
        if address.is_none() {
            errors.insert(
                format!("founder_allocation[{i}].founder_address"),
                FieldError::InvalidAddress,
            );
        }
        resolved.push(address);

        let percentage_ok = (0..=100).contains(&entry.allocation_percentage)
            && (entry.admin || entry.allocation_percentage > 0);
        if !percentage_ok {
            errors.insert(
                format!("founder_allocation[{i}].allocation_percentage"),
                FieldError::OutOfRange,
            );
        }

        let in_future = DateTime::parse_from_rfc3339(&entry.end_date)
            .map(|date| date.with_timezone(&Utc) > now)
            .unwrap_or(false);
        if !in_future {
            errors.insert(
                format!("founder_allocation[{i}].end_date"),
                FieldError::DateNotInFuture,
            );
        }
    }

    if let Some(first) = resolved[0] {
        if first != signer {
            errors.insert(
                "founder_allocation[0].founder_address",
                FieldError::NotFounder,
            );
        }
    }

    // Case-insensitive: hex parses normalize, aliases compare lowercased.
    let mut seen = std::collections::BTreeSet::new();
    for (entry, address) in entries.iter().zip(&resolved) {
        let key = match address {
            Some(address) => format!("{address:?}"),
            None => entry.founder_address.trim().to_lowercase(),
        };
        if !seen.insert(key) {
            errors.insert("founder_allocation", FieldError::DuplicateAllocation);
            break;
        }
    }

    errors.into_result()
}

/// Cancellable timer around an async call. A new call supersedes the pending
/// one, so only the last call within the quiet period actually runs.
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
        }
    }

    /// Runs `f` after the quiet period. Returns `None` if a newer call
    /// supersedes this one before it fires.
    pub async fn debounce<F, Fut, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let quiet = self.quiet;
        let handle = tokio::spawn(async move {
            sleep(quiet).await;
            let _ = tx.send(f().await);
        });

        if let Some(previous) = self.pending.lock().unwrap().replace(handle) {
            previous.abort();
        }

        rx.await.ok()
    }
}

/// Debounced [`AddressResolver`]: lookups fired while the user is still
/// typing are superseded and report "not resolvable".
pub struct DebouncedResolver<R> {
    inner: Arc<R>,
    debouncer: Debouncer,
}

impl<R> DebouncedResolver<R> {
    pub fn new(inner: Arc<R>, quiet: Duration) -> Self {
        Self {
            inner,
            debouncer: Debouncer::new(quiet),
        }
    }
}

#[async_trait]
impl<R: AddressResolver + 'static> AddressResolver for DebouncedResolver<R> {
    async fn resolve(&self, name: &str) -> Option<Address> {
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        self.debouncer
            .debounce(move || async move { inner.resolve(&name).await })
            .await
            .flatten()
    }
}
