//! Reads the state of a deployed allowance wallet and draws today's allowance.
//!
//! Configuration comes from the environment (or a `.env` file):
//! `RPC_URL`, `PRIV_KEY_PATH` and `STYLUS_CONTRACT_ADDRESS`.

use dotenv::dotenv;
use ethers::{
    middleware::SignerMiddleware,
    prelude::abigen,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::Address,
};
use eyre::eyre;
use std::io::{BufRead, BufReader};
use std::str::FromStr;
use std::sync::Arc;

const PRIV_KEY_PATH: &str = "PRIV_KEY_PATH";
const RPC_URL: &str = "RPC_URL";
const STYLUS_CONTRACT_ADDRESS: &str = "STYLUS_CONTRACT_ADDRESS";

abigen!(
    AllowanceWallet,
    r#"[
        function owner() external view returns (address)
        function payee() external view returns (address)
        function getBalance() external view returns (uint256)
        function dailyAllowance() external view returns (uint256)
        function lastWithdrawal(address account) external view returns (uint256)
        function nextAllowanceAt(address account) external view returns (uint256)
        function receiveAllowance() external
    ]"#
);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    let priv_key_path =
        std::env::var(PRIV_KEY_PATH).map_err(|_| eyre!("No {} env var set", PRIV_KEY_PATH))?;
    let rpc_url = std::env::var(RPC_URL).map_err(|_| eyre!("No {} env var set", RPC_URL))?;
    let contract_address = std::env::var(STYLUS_CONTRACT_ADDRESS)
        .map_err(|_| eyre!("No {} env var set", STYLUS_CONTRACT_ADDRESS))?;

    let provider = Provider::<Http>::try_from(rpc_url)?;
    let address: Address = contract_address.parse()?;

    let privkey = read_secret_from_file(&priv_key_path)?;
    let signer = LocalWallet::from_str(&privkey)?;
    let chain_id = provider.get_chainid().await?.as_u64();
    let client = Arc::new(SignerMiddleware::new(
        provider,
        signer.clone().with_chain_id(chain_id),
    ));

    let wallet = AllowanceWallet::new(address, client);

    let owner = wallet.owner().call().await?;
    let payee = wallet.payee().call().await?;
    let balance = wallet.get_balance().call().await?;
    let allowance = wallet.daily_allowance().call().await?;
    println!("owner = {owner:?}, payee = {payee:?}");
    println!("balance = {balance} wei, daily allowance = {allowance} wei");

    let me = signer.address();
    if me != owner && me != payee {
        return Err(eyre!("{me:?} is neither the owner nor the payee"));
    }

    let next = wallet.next_allowance_at(me).call().await?;
    let last = wallet.last_withdrawal(me).call().await?;
    println!("last withdrawal = {last}, next allowance at = {next}");

    let receipt = wallet.receive_allowance().send().await?.await?;
    println!("allowance drawn, receipt = {receipt:?}");

    Ok(())
}

fn read_secret_from_file(fpath: &str) -> eyre::Result<String> {
    let f = std::fs::File::open(fpath)?;
    let mut buf_reader = BufReader::new(f);
    let mut secret = String::new();
    buf_reader.read_line(&mut secret)?;
    Ok(secret.trim().to_string())
}
