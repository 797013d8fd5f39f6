//! Escrow HTTP API client

use anyhow::{anyhow, Result};
use bounty_escrow::server::{
    AmountResponse, BountyListResponse, CompleteResponse, DepositResponse, ErrorBody,
    EventsResponse, PoolResponse, ProtocolResponse,
};
use bounty_escrow::types::amount_string;
use bounty_escrow::{Amount, Bounty, BountyId, BountyStatus, Identity};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct CallerBody {
    caller: Identity,
}

#[derive(Debug, Serialize)]
struct DepositBody<'a> {
    caller: Identity,
    issue_reference: &'a str,
    #[serde(with = "amount_string")]
    value: Amount,
}

#[derive(Debug, Serialize)]
struct SetFeeBody {
    caller: Identity,
    fee_bps: u16,
}

#[derive(Debug, Serialize)]
struct TransferOwnerBody {
    caller: Identity,
    new_owner: Identity,
}

pub struct EscrowClient {
    client: Client,
    base_url: String,
}

impl EscrowClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn deposit(
        &self,
        caller: Identity,
        issue_reference: &str,
        value: Amount,
    ) -> Result<BountyId> {
        let body = DepositBody {
            caller,
            issue_reference,
            value,
        };
        let resp: DepositResponse = self
            .send(self.client.post(self.url("bounties")).json(&body))
            .await?;
        Ok(resp.bounty_id)
    }

    pub async fn claim(&self, caller: Identity, id: BountyId) -> Result<Bounty> {
        self.send(
            self.client
                .post(self.url(&format!("bounties/{}/claim", id)))
                .json(&CallerBody { caller }),
        )
        .await
    }

    pub async fn complete(&self, caller: Identity, id: BountyId) -> Result<CompleteResponse> {
        self.send(
            self.client
                .post(self.url(&format!("bounties/{}/complete", id)))
                .json(&CallerBody { caller }),
        )
        .await
    }

    pub async fn refund(&self, caller: Identity, id: BountyId) -> Result<Bounty> {
        self.send(
            self.client
                .post(self.url(&format!("bounties/{}/refund", id)))
                .json(&CallerBody { caller }),
        )
        .await
    }

    pub async fn withdraw(&self, caller: Identity) -> Result<AmountResponse> {
        self.send(
            self.client
                .post(self.url("withdraw"))
                .json(&CallerBody { caller }),
        )
        .await
    }

    pub async fn get_bounty(&self, id: BountyId) -> Result<Bounty> {
        self.send(self.client.get(self.url(&format!("bounties/{}", id))))
            .await
    }

    pub async fn bounty_history(&self, id: BountyId) -> Result<EventsResponse> {
        self.send(self.client.get(self.url(&format!("bounties/{}/history", id))))
            .await
    }

    pub async fn list_bounties(
        &self,
        status: Option<BountyStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Bounty>> {
        let mut path = format!("bounties?limit={}&offset={}", limit, offset);
        if let Some(status) = status {
            path.push_str(&format!("&status={}", status.as_str()));
        }
        let resp: BountyListResponse = self.send(self.client.get(self.url(&path))).await?;
        Ok(resp.bounties)
    }

    pub async fn balance(&self, identity: Identity) -> Result<AmountResponse> {
        self.send(self.client.get(self.url(&format!("balances/{}", identity))))
            .await
    }

    pub async fn pool(&self) -> Result<PoolResponse> {
        self.send(self.client.get(self.url("pool"))).await
    }

    pub async fn protocol(&self) -> Result<ProtocolResponse> {
        self.send(self.client.get(self.url("config"))).await
    }

    pub async fn set_fee(&self, caller: Identity, fee_bps: u16) -> Result<ProtocolResponse> {
        self.send(
            self.client
                .post(self.url("admin/fee"))
                .json(&SetFeeBody { caller, fee_bps }),
        )
        .await
    }

    pub async fn transfer_owner(
        &self,
        caller: Identity,
        new_owner: Identity,
    ) -> Result<ProtocolResponse> {
        self.send(
            self.client
                .post(self.url("admin/owner"))
                .json(&TransferOwnerBody { caller, new_owner }),
        )
        .await
    }

    pub async fn events(&self, after: u64, limit: usize) -> Result<EventsResponse> {
        self.send(
            self.client
                .get(self.url(&format!("events?after={}&limit={}", after, limit))),
        )
        .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(error_from(resp).await)
        }
    }
}

async fn error_from(resp: Response) -> anyhow::Error {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => anyhow!("{}: {}", body.error, body.message),
        Err(_) => anyhow!("Request failed ({}): {}", status, text),
    }
}
