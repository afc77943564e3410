//! Local transaction builders and the action-to-builder factory.

use async_trait::async_trait;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_system_interface::instruction as system_instruction;
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use spl_token_interface::instruction as token_instruction;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::fees::FeeStrategy;
use super::remote::{RemoteTransactionBuilder, SwapTransactionBuilder};
use crate::domain::{
    ActionRequest, AppError, BuilderFactory, ChainClient, ConfigError, TransactionBuilder,
    TransactionError, ValidationError,
};

/// Mint layout (SPL Token and Token-2022): decimals at byte 44
const MINT_DECIMALS_OFFSET: usize = 44;
const MIN_MINT_SIZE: usize = 82;
/// Token account layout: amount is at bytes 64-72 (u64 LE)
const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;

/// Assemble an unsigned legacy transaction with empty signature slots
pub fn unsigned_transaction(
    instructions: &[Instruction],
    payer: &Pubkey,
    blockhash: Hash,
) -> VersionedTransaction {
    let message = Message::new_with_blockhash(instructions, Some(payer), &blockhash);
    let required = usize::from(message.header.num_required_signatures);
    VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::Legacy(message),
    }
}

/// Native SOL payment (plain transfers and wager stakes)
pub struct SolTransferBuilder {
    chain: Arc<dyn ChainClient>,
    fees: Arc<dyn FeeStrategy>,
    to: Pubkey,
    lamports: u64,
    label: &'static str,
}

impl SolTransferBuilder {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        fees: Arc<dyn FeeStrategy>,
        to: Pubkey,
        lamports: u64,
    ) -> Self {
        Self {
            chain,
            fees,
            to,
            lamports,
            label: "sol_transfer",
        }
    }

    /// Same transfer, reported as a wager in logs
    #[must_use]
    pub fn as_wager(mut self) -> Self {
        self.label = "wager";
        self
    }
}

#[async_trait]
impl TransactionBuilder for SolTransferBuilder {
    #[instrument(skip(self), fields(builder = self.label, to = %self.to, lamports = self.lamports))]
    async fn build(&self, payer: &Pubkey) -> Result<VersionedTransaction, TransactionError> {
        if self.lamports == 0 {
            return Err(TransactionError::Build(
                "Transfer amount must be greater than 0".to_string(),
            ));
        }

        let priority_fee = self.fees.get_priority_fee(&[*payer, self.to]).await;
        let instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_price(priority_fee),
            system_instruction::transfer(payer, &self.to, self.lamports),
        ];

        let blockhash = self.chain.get_latest_blockhash().await?;
        debug!(priority_fee = priority_fee, blockhash = %blockhash, "Built SOL transfer");
        Ok(unsigned_transaction(&instructions, payer, blockhash))
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// SPL token or NFT transfer with destination ATA creation
pub struct TokenTransferBuilder {
    chain: Arc<dyn ChainClient>,
    fees: Arc<dyn FeeStrategy>,
    to: Pubkey,
    mint: Pubkey,
    /// UI amount, converted with the mint's decimals
    amount: f64,
}

impl TokenTransferBuilder {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        fees: Arc<dyn FeeStrategy>,
        to: Pubkey,
        mint: Pubkey,
        amount: f64,
    ) -> Self {
        Self {
            chain,
            fees,
            to,
            mint,
            amount,
        }
    }
}

/// Convert a UI amount into raw token units
pub fn to_raw_amount(amount: f64, decimals: u8) -> Result<u64, TransactionError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(TransactionError::Build(
            "Transfer amount must be greater than 0".to_string(),
        ));
    }
    let raw = (amount * 10f64.powi(i32::from(decimals))).round();
    if raw < 1.0 || raw > u64::MAX as f64 {
        return Err(TransactionError::Build(format!(
            "Amount {} is not representable with {} decimals",
            amount, decimals
        )));
    }
    Ok(raw as u64)
}

#[async_trait]
impl TransactionBuilder for TokenTransferBuilder {
    #[instrument(skip(self), fields(to = %self.to, mint = %self.mint, amount = self.amount))]
    async fn build(&self, payer: &Pubkey) -> Result<VersionedTransaction, TransactionError> {
        // The mint account's owner is the token program ID (SPL Token or Token-2022)
        let mint_account = self.chain.get_account(&self.mint).await?.ok_or_else(|| {
            TransactionError::Build(format!("Mint account {} not found", self.mint))
        })?;
        let token_program_id: Pubkey = mint_account.owner.parse().map_err(|e| {
            TransactionError::Serialization(format!("Invalid mint owner: {}", e))
        })?;

        if mint_account.data.len() < MIN_MINT_SIZE {
            return Err(TransactionError::Build(format!(
                "Mint account data too small: {} bytes, expected at least {}",
                mint_account.data.len(),
                MIN_MINT_SIZE
            )));
        }
        let decimals = mint_account.data[MINT_DECIMALS_OFFSET];
        let raw_amount = to_raw_amount(self.amount, decimals)?;

        let source_ata =
            get_associated_token_address_with_program_id(payer, &self.mint, &token_program_id);
        let destination_ata =
            get_associated_token_address_with_program_id(&self.to, &self.mint, &token_program_id);
        debug!(
            source_ata = %source_ata,
            destination_ata = %destination_ata,
            token_program_id = %token_program_id,
            decimals = decimals,
            raw_amount = raw_amount,
            "Derived ATAs for token transfer"
        );

        let source_account = self.chain.get_account(&source_ata).await?.ok_or_else(|| {
            TransactionError::Build(format!(
                "Wallet {} has no token account for mint {}",
                payer, self.mint
            ))
        })?;
        if source_account.owner != token_program_id.to_string() {
            return Err(TransactionError::Build(format!(
                "Source token account is owned by {}, expected {}",
                source_account.owner, token_program_id
            )));
        }
        if let Some(bytes) = source_account
            .data
            .get(TOKEN_ACCOUNT_AMOUNT_OFFSET..TOKEN_ACCOUNT_AMOUNT_OFFSET + 8)
        {
            let mut balance_bytes = [0u8; 8];
            balance_bytes.copy_from_slice(bytes);
            let balance = u64::from_le_bytes(balance_bytes);
            if balance < raw_amount {
                return Err(TransactionError::Build(format!(
                    "Insufficient token balance: have {}, need {}",
                    balance, raw_amount
                )));
            }
        }

        let priority_fee = self
            .fees
            .get_priority_fee(&[*payer, source_ata, destination_ata])
            .await;
        let mut instructions = vec![ComputeBudgetInstruction::set_compute_unit_price(
            priority_fee,
        )];

        if self.chain.get_account(&destination_ata).await?.is_none() {
            info!(destination_ata = %destination_ata, "Creating destination ATA");
            instructions.push(create_associated_token_account_idempotent(
                payer,
                &self.to,
                &self.mint,
                &token_program_id,
            ));
        }

        let transfer_ix = token_instruction::transfer_checked(
            &token_program_id,
            &source_ata,
            &self.mint,
            &destination_ata,
            payer,
            &[],
            raw_amount,
            decimals,
        )
        .map_err(|e| {
            TransactionError::Build(format!("Failed to create transfer_checked instruction: {}", e))
        })?;
        instructions.push(transfer_ix);

        let blockhash = self.chain.get_latest_blockhash().await?;
        Ok(unsigned_transaction(&instructions, payer, blockhash))
    }

    fn name(&self) -> &'static str {
        "token_transfer"
    }
}

/// Maps action requests onto local and remote builders
pub struct DefaultBuilderFactory {
    chain: Arc<dyn ChainClient>,
    fees: Arc<dyn FeeStrategy>,
    http_client: reqwest::Client,
    swap_api_url: String,
    remote_endpoints: HashMap<String, String>,
}

impl DefaultBuilderFactory {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        fees: Arc<dyn FeeStrategy>,
        http_client: reqwest::Client,
        swap_api_url: impl Into<String>,
        remote_endpoints: HashMap<String, String>,
    ) -> Self {
        Self {
            chain,
            fees,
            http_client,
            swap_api_url: swap_api_url.into(),
            remote_endpoints,
        }
    }

    /// Names of the configured remote endpoints
    pub fn remote_endpoint_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.remote_endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Parse `name=url,name=url` into an endpoint map
pub fn parse_endpoint_map(value: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut endpoints = HashMap::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, url) = entry
            .split_once('=')
            .map(|(name, url)| (name.trim(), url.trim()))
            .filter(|(name, url)| !name.is_empty() && !url.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                name: "REMOTE_ENDPOINTS".to_string(),
                message: format!("Expected name=url, got '{}'", entry),
            })?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                name: "REMOTE_ENDPOINTS".to_string(),
                message: format!("Endpoint '{}' must be an http(s) URL", name),
            });
        }
        endpoints.insert(name.to_string(), url.to_string());
    }
    Ok(endpoints)
}

fn invalid_field(field: &str, message: impl Into<String>) -> AppError {
    AppError::Validation(ValidationError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    })
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, AppError> {
    value
        .parse::<Pubkey>()
        .map_err(|e| invalid_field(field, format!("Invalid address '{}': {}", value, e)))
}

fn require_positive_lamports(lamports: u64) -> Result<(), AppError> {
    if lamports == 0 {
        return Err(invalid_field("lamports", "Must be greater than 0"));
    }
    Ok(())
}

impl BuilderFactory for DefaultBuilderFactory {
    fn builder_for(&self, action: &ActionRequest) -> Result<Box<dyn TransactionBuilder>, AppError> {
        let builder: Box<dyn TransactionBuilder> = match action {
            ActionRequest::TransferSol {
                to_address,
                lamports,
            } => {
                require_positive_lamports(*lamports)?;
                let to = parse_pubkey("to_address", to_address)?;
                Box::new(SolTransferBuilder::new(
                    Arc::clone(&self.chain),
                    Arc::clone(&self.fees),
                    to,
                    *lamports,
                ))
            }
            ActionRequest::Wager {
                escrow_address,
                lamports,
            } => {
                require_positive_lamports(*lamports)?;
                let escrow = parse_pubkey("escrow_address", escrow_address)?;
                Box::new(
                    SolTransferBuilder::new(
                        Arc::clone(&self.chain),
                        Arc::clone(&self.fees),
                        escrow,
                        *lamports,
                    )
                    .as_wager(),
                )
            }
            ActionRequest::TransferToken {
                to_address,
                mint,
                amount,
            } => {
                if !amount.is_finite() || *amount <= 0.0 {
                    return Err(invalid_field("amount", "Must be greater than 0"));
                }
                let to = parse_pubkey("to_address", to_address)?;
                let mint = parse_pubkey("mint", mint)?;
                Box::new(TokenTransferBuilder::new(
                    Arc::clone(&self.chain),
                    Arc::clone(&self.fees),
                    to,
                    mint,
                    *amount,
                ))
            }
            ActionRequest::Swap {
                input_mint,
                output_mint,
                amount,
                slippage_bps,
            } => {
                if *amount == 0 {
                    return Err(invalid_field("amount", "Must be greater than 0"));
                }
                if *slippage_bps > 10_000 {
                    return Err(invalid_field("slippage_bps", "Must be at most 10000"));
                }
                let input = parse_pubkey("input_mint", input_mint)?;
                let output = parse_pubkey("output_mint", output_mint)?;
                if input == output {
                    return Err(invalid_field("output_mint", "Must differ from input_mint"));
                }
                Box::new(SwapTransactionBuilder::new(
                    self.http_client.clone(),
                    &self.swap_api_url,
                    input,
                    output,
                    *amount,
                    *slippage_bps,
                ))
            }
            ActionRequest::Remote { endpoint, payload } => {
                let url = self.remote_endpoints.get(endpoint).ok_or_else(|| {
                    invalid_field("endpoint", format!("Unknown endpoint '{}'", endpoint))
                })?;
                if !(payload.is_object() || payload.is_null()) {
                    return Err(invalid_field("payload", "Must be a JSON object"));
                }
                Box::new(RemoteTransactionBuilder::new(
                    self.http_client.clone(),
                    endpoint,
                    url,
                    payload.clone(),
                ))
            }
        };
        Ok(builder)
    }
}
