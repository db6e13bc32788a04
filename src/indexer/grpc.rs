//! Geyser gRPC transport (spec.md §4.4, §6.2): the real `AccountStream`
//! backing the live indexer, subscribing with an offset-0 memcmp
//! discriminator filter on the configured owner program.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::sink::{Sink, SinkExt};
use futures::stream::{Stream, StreamExt};
use solana_sdk::pubkey::Pubkey;
use yellowstone_grpc_client::GeyserGrpcClient;
use yellowstone_grpc_proto::prelude::{
    subscribe_request_filter_accounts_filter::Filter as AccountsFilter,
    subscribe_request_filter_accounts_filter_memcmp::Data as MemcmpData,
    subscribe_update::UpdateOneof,
    CommitmentLevel, SubscribeRequest, SubscribeRequestFilterAccounts,
    SubscribeRequestFilterAccountsFilter, SubscribeRequestFilterAccountsFilterMemcmp,
    SubscribeRequestPing, SubscribeUpdate,
};
use yellowstone_grpc_proto::tonic::Status;

use super::{AccountStream, AccountUpdate, StreamEvent};
use crate::error::IndexerError;

type UpdateSink = Pin<Box<dyn Sink<SubscribeRequest, Error = mpsc::SendError> + Send>>;
type UpdateStream = Pin<Box<dyn Stream<Item = Result<SubscribeUpdate, Status>> + Send>>;

/// A live Geyser subscription to accounts owned by one program, filtered to
/// one discriminator at offset zero (spec.md §6.2).
pub struct GrpcAccountStream {
    sink: UpdateSink,
    updates: UpdateStream,
}

impl GrpcAccountStream {
    /// Connect and subscribe in one step. `x_token` is the Geyser auth
    /// token, if the endpoint requires one.
    pub async fn connect(
        endpoint: String,
        x_token: Option<String>,
        owner_program: Pubkey,
        discriminator: [u8; 8],
    ) -> Result<Self, IndexerError> {
        let mut builder = GeyserGrpcClient::build_from_shared(endpoint)
            .map_err(|e| IndexerError::Transport(e.to_string()))?;
        builder = builder
            .x_token(x_token)
            .map_err(|e| IndexerError::Transport(e.to_string()))?;
        let mut client = builder
            .connect()
            .await
            .map_err(|e| IndexerError::Transport(e.to_string()))?;

        let mut accounts = HashMap::new();
        accounts.insert(
            "obligations".to_string(),
            SubscribeRequestFilterAccounts {
                account: vec![],
                owner: vec![owner_program.to_string()],
                filters: vec![SubscribeRequestFilterAccountsFilter {
                    filter: Some(AccountsFilter::Memcmp(
                        SubscribeRequestFilterAccountsFilterMemcmp {
                            offset: 0,
                            data: Some(MemcmpData::Base58(bs58::encode(discriminator).into_string())),
                        },
                    )),
                }],
            },
        );

        let request = SubscribeRequest {
            accounts,
            commitment: Some(CommitmentLevel::Confirmed as i32),
            ..Default::default()
        };

        let (sink, updates) = client
            .subscribe_with_request(Some(request))
            .await
            .map_err(|e| IndexerError::Transport(e.to_string()))?;

        Ok(Self {
            sink: Box::pin(sink),
            updates: Box::pin(updates),
        })
    }
}

fn decode_update(update: SubscribeUpdate) -> StreamEvent {
    match update.update_oneof {
        Some(UpdateOneof::Account(account)) => match account.account {
            Some(info) => match Pubkey::try_from(info.pubkey.as_slice()) {
                Ok(pubkey) => StreamEvent::Account(AccountUpdate {
                    pubkey,
                    data: info.data,
                    slot: account.slot,
                    is_startup: account.is_startup,
                }),
                Err(_) => StreamEvent::Ping,
            },
            None => StreamEvent::Ping,
        },
        Some(UpdateOneof::Slot(slot)) => StreamEvent::Slot(slot.slot),
        Some(UpdateOneof::Ping(_)) | Some(UpdateOneof::Pong(_)) => StreamEvent::Ping,
        _ => StreamEvent::Ping,
    }
}

#[async_trait]
impl AccountStream for GrpcAccountStream {
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, IndexerError> {
        match self.updates.next().await {
            None => Ok(None),
            Some(Err(status)) => Err(IndexerError::Transport(status.to_string())),
            Some(Ok(update)) => Ok(Some(decode_update(update))),
        }
    }

    async fn send_keepalive(&mut self) -> Result<(), IndexerError> {
        let ping = SubscribeRequest {
            ping: Some(SubscribeRequestPing { id: 1 }),
            ..Default::default()
        };
        self.sink
            .send(ping)
            .await
            .map_err(|e| IndexerError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}
