//! Transfer orchestration: one table, one submission.
//!
//! A [`StatbankTransfer`] walks a fixed sequence of stages:
//!
//! `Created → ParamsValidated → SchemaFetched → DataValidated (optional) →
//! BodyEncoded → Authenticated → Submitted → ResponseParsed → Succeeded | Failed`
//!
//! Construction validates the scalar parameters and performs no I/O, so a
//! transfer can be built now and submitted later. [`StatbankTransfer::transfer`]
//! prompts for the password itself; [`StatbankTransfer::submit`] takes a header
//! built elsewhere, which is how a [`TransferBatch`] shares one password prompt
//! between many transfers.
//!
//! # Secrets
//! The [`AuthHeader`] is never stored on the transfer. It is borrowed for the
//! duration of a submission and dropped by whoever created it.
//!
//! # Retries
//! There are none. The loader has no idempotency key, so a transfer that has
//! succeeded or failed refuses to submit again; build a new one instead.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{authenticate, AuthHeader};
use crate::config::StatbankConfig;
use crate::contract::{CredentialEncryptor, PasswordPrompt, StatbankApi};
use crate::data::DataPart;
use crate::description::{fetch_description, TableDescription};
use crate::encode::encode_body;
use crate::error::{Result, StatbankError};
use crate::params::{
    check_initials, check_table, parse_publish_date, tomorrow, ApprovalPolicy, LoadParams,
    OverwritePolicy,
};
use crate::response::{extract_message, parse_message};
use crate::validate::validate;

/// Everything needed for one submission.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// In the same order as the description's parts.
    pub parts: Vec<DataPart>,
    /// Five-digit table id or the main table's name.
    pub table: String,
    pub loaduser: String,
    pub initials: String,
    pub responsible1: String,
    pub responsible2: String,
    /// `YYYY-MM-DD`.
    pub publish_date: String,
    pub overwrite: OverwritePolicy,
    pub approval: ApprovalPolicy,
    pub validate: bool,
}

impl TransferRequest {
    /// A request with the loader's defaults: publish tomorrow, overwrite,
    /// just-in-time approval, validation on, the loader's initials as both
    /// responsible parties.
    pub fn new(
        table: impl Into<String>,
        loaduser: impl Into<String>,
        initials: impl Into<String>,
        parts: Vec<DataPart>,
    ) -> Self {
        let initials = initials.into();
        Self {
            parts,
            table: table.into(),
            loaduser: loaduser.into(),
            responsible1: initials.clone(),
            responsible2: initials.clone(),
            initials,
            publish_date: tomorrow().format("%Y-%m-%d").to_string(),
            overwrite: OverwritePolicy::default(),
            approval: ApprovalPolicy::default(),
            validate: true,
        }
    }

    /// A request for a table with exactly one part.
    pub fn single(
        table: impl Into<String>,
        loaduser: impl Into<String>,
        initials: impl Into<String>,
        part: DataPart,
    ) -> Self {
        Self::new(table, loaduser, initials, vec![part])
    }

    pub fn responsible(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.responsible1 = first.into();
        self.responsible2 = second.into();
        self
    }

    pub fn publish_on(mut self, date: impl Into<String>) -> Self {
        self.publish_date = date.into();
        self
    }

    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    pub fn approval(mut self, policy: ApprovalPolicy) -> Self {
        self.approval = policy;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Local checks only; returns the parsed publish date.
    pub fn check(&self) -> Result<NaiveDate> {
        check_table(&self.table)?;
        if self.loaduser.trim().is_empty() {
            return Err(StatbankError::configuration("loaduser must be set"));
        }
        check_initials("initials", &self.initials)?;
        check_initials("responsible1", &self.responsible1)?;
        check_initials("responsible2", &self.responsible2)?;
        parse_publish_date(&self.publish_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Created,
    ParamsValidated,
    SchemaFetched,
    DataValidated,
    BodyEncoded,
    Authenticated,
    Submitted,
    ResponseParsed,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub job_number: String,
    pub publish_at: NaiveDateTime,
    pub raw_response: String,
    pub table_id: String,
    pub main_table_name: String,
    pub log_gui_url: String,
    pub log_api_url: String,
}

pub struct StatbankTransfer<'a, A: StatbankApi + ?Sized> {
    id: Uuid,
    api: &'a A,
    config: &'a StatbankConfig,
    request: TransferRequest,
    publish_date: NaiveDate,
    description: Option<TableDescription>,
    state: TransferState,
    result: Option<TransferResult>,
}

impl<'a, A: StatbankApi + ?Sized> StatbankTransfer<'a, A> {
    /// Validates the request's scalar parameters. No network traffic.
    pub fn new(api: &'a A, config: &'a StatbankConfig, request: TransferRequest) -> Result<Self> {
        let id = Uuid::new_v4();
        let publish_date = request.check().map_err(|e| {
            error!(transfer_id = %id, table = %request.table, error = %e, "[TRANSFER] Invalid parameters");
            e
        })?;
        info!(
            transfer_id = %id,
            table = %request.table,
            parts = request.parts.len(),
            publish_date = %publish_date,
            "[TRANSFER] Parameters validated"
        );
        Ok(Self {
            id,
            api,
            config,
            request,
            publish_date,
            description: None,
            state: TransferState::ParamsValidated,
            result: None,
        })
    }

    /// Reuses an already fetched description instead of fetching again.
    pub fn with_description(mut self, description: TableDescription) -> Self {
        self.description = Some(description);
        self.state = TransferState::SchemaFetched;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn request(&self) -> &TransferRequest {
        &self.request
    }

    /// The description supplied with [`Self::with_description`], until a
    /// submission consumes it.
    pub fn description(&self) -> Option<&TableDescription> {
        self.description.as_ref()
    }

    pub fn result(&self) -> Option<&TransferResult> {
        self.result.as_ref()
    }

    /// Prompts for the password, then submits. The header lives only for this call.
    pub async fn transfer<E, P>(&mut self, encryptor: &E, prompt: &P) -> Result<&TransferResult>
    where
        E: CredentialEncryptor + ?Sized,
        P: PasswordPrompt + ?Sized,
    {
        self.ensure_unsubmitted()?;
        let auth = match authenticate(encryptor, prompt, &self.request.loaduser).await {
            Ok(auth) => auth,
            Err(e) => {
                self.state = TransferState::Failed;
                return Err(e);
            }
        };
        self.submit(&auth).await
    }

    /// Runs every remaining stage with a header built by the caller.
    pub async fn submit(&mut self, auth: &AuthHeader) -> Result<&TransferResult> {
        self.ensure_unsubmitted()?;
        match self.run(auth).await {
            Ok(result) => {
                self.state = TransferState::Succeeded;
                info!(
                    transfer_id = %self.id,
                    job_number = %result.job_number,
                    publish_at = %result.publish_at.format("%Y-%m-%d %H:%M"),
                    log = %result.log_gui_url,
                    "[TRANSFER] Transfer succeeded"
                );
                Ok(&*self.result.insert(result))
            }
            Err(e) => {
                error!(transfer_id = %self.id, state = ?self.state, error = %e, "[TRANSFER] Transfer failed");
                self.state = TransferState::Failed;
                Err(e)
            }
        }
    }

    fn ensure_unsubmitted(&self) -> Result<()> {
        if let Some(result) = &self.result {
            warn!(transfer_id = %self.id, job_number = %result.job_number, "[TRANSFER] Refusing resubmission");
            return Err(StatbankError::Resubmission(format!(
                "already loaded as job {}",
                result.job_number
            )));
        }
        if self.state == TransferState::Failed {
            warn!(transfer_id = %self.id, "[TRANSFER] Refusing to reuse a failed transfer");
            return Err(StatbankError::Resubmission(
                "transfer already failed; build a new one".to_string(),
            ));
        }
        Ok(())
    }

    async fn run(&mut self, auth: &AuthHeader) -> Result<TransferResult> {
        // Consumed by this run; the result keeps the table id and name.
        let description = match self.description.take() {
            Some(description) => description,
            None => fetch_description(self.api, auth, &self.request.table).await?,
        };
        let description = &description;
        self.state = TransferState::SchemaFetched;

        if self.request.validate {
            validate(&self.request.parts, description, true)?;
            self.state = TransferState::DataValidated;
        }

        let body = encode_body(&self.request.parts, description)?;
        self.state = TransferState::BodyEncoded;

        let params = LoadParams {
            initials: self.request.initials.clone(),
            main_table_name: description.main_table_name.clone(),
            publish_date: self.publish_date,
            responsible1: self.request.responsible1.clone(),
            responsible2: self.request.responsible2.clone(),
            overwrite: self.request.overwrite,
            approval: self.request.approval,
        };
        self.state = TransferState::Authenticated;

        info!(
            transfer_id = %self.id,
            table_id = %description.table_id,
            main_table = %description.main_table_name,
            body_bytes = body.len(),
            "[TRANSFER] Submitting to loader"
        );
        let response = self.api.post_data(auth, &params, body).await?;
        self.state = TransferState::Submitted;

        if !response.is_ok() {
            let shown = extract_message(&response.body).unwrap_or_else(|_| response.body.clone());
            error!(transfer_id = %self.id, status = response.status, message = %shown, "[TRANSFER] Loader refused the data");
            return Err(StatbankError::connection(Some(response.status), response.body));
        }

        let message = extract_message(&response.body)?;
        let status = parse_message(&message)?;
        self.state = TransferState::ResponseParsed;

        Ok(TransferResult {
            log_gui_url: self.config.log_gui_url(&status.job_number),
            log_api_url: self.config.log_api_url(&status.job_number),
            job_number: status.job_number,
            publish_at: status.publish_at,
            raw_response: response.body,
            table_id: description.table_id.clone(),
            main_table_name: description.main_table_name.clone(),
        })
    }
}

/// Deferred transfers submitted together behind a single password prompt.
pub struct TransferBatch<'a, A: StatbankApi + ?Sized> {
    transfers: Vec<StatbankTransfer<'a, A>>,
}

impl<'a, A: StatbankApi + ?Sized> Default for TransferBatch<'a, A> {
    fn default() -> Self {
        Self { transfers: Vec::new() }
    }
}

impl<'a, A: StatbankApi + ?Sized> TransferBatch<'a, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transfer: StatbankTransfer<'a, A>) {
        self.transfers.push(transfer);
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn transfers(&self) -> &[StatbankTransfer<'a, A>] {
        &self.transfers
    }

    /// Authenticates once and submits every transfer in order, stopping at the
    /// first failure. The shared header is dropped when this returns.
    pub async fn submit_all<E, P>(&mut self, encryptor: &E, prompt: &P) -> Result<Vec<TransferResult>>
    where
        E: CredentialEncryptor + ?Sized,
        P: PasswordPrompt + ?Sized,
    {
        let Some(first) = self.transfers.first() else {
            return Ok(Vec::new());
        };
        let loaduser = first.request.loaduser.clone();
        if let Some(other) = self.transfers.iter().find(|t| t.request.loaduser != loaduser) {
            return Err(StatbankError::configuration(format!(
                "a batch shares one login; loaduser {} differs from {loaduser}",
                other.request.loaduser
            )));
        }

        info!(transfers = self.transfers.len(), loaduser = %loaduser, "[BATCH] Authenticating once for batch");
        let auth = authenticate(encryptor, prompt, &loaduser).await?;

        let mut results = Vec::with_capacity(self.transfers.len());
        for (index, transfer) in self.transfers.iter_mut().enumerate() {
            match transfer.submit(&auth).await {
                Ok(result) => results.push(result.clone()),
                Err(e) => {
                    error!(index, submitted = results.len(), error = %e, "[BATCH] Stopping batch at failed transfer");
                    return Err(e);
                }
            }
        }
        info!(submitted = results.len(), "[BATCH] Batch complete");
        Ok(results)
    }
}
