//! Read-only Drive browsing through the gateway.

use std::sync::Arc;

use serde_json::json;
use slidebatch::gateway::{DriveQuery, GatewayError};
use slidebatch::{CredentialGuard, Gateway, HttpGateway, ImageRef};
use slidebatch_protocol::Provider;

use super::{CommandOutput, gateway_failure, stored_token};
use crate::cli::PageArgs;
use crate::context::CommandContext;
use crate::error::Result;

/// Gateway access authenticated with the stored Google token.
pub(super) struct Drive {
	gateway: Arc<HttpGateway>,
	guard: CredentialGuard,
	token: String,
}

impl Drive {
	pub(super) async fn connect(ctx: &CommandContext) -> Result<Self> {
		let store = ctx.open_store()?;
		let gateway = ctx.gateway()?;
		let token = stored_token(&store, Provider::Google).await?;
		let guard = CredentialGuard::new(store, gateway.clone());
		Ok(Self { gateway, guard, token })
	}

	async fn settle<T>(&self, result: std::result::Result<T, GatewayError>) -> Result<T> {
		match result {
			Ok(value) => Ok(value),
			Err(err) => Err(gateway_failure(&self.guard, err).await),
		}
	}

	pub(super) async fn doc_text(&self, id: &str) -> Result<String> {
		self.settle(self.gateway.doc_content(&self.token, id).await).await
	}

	/// Every image in `folder`, following continuation tokens.
	pub(super) async fn folder_images(&self, folder: &str) -> Result<Vec<ImageRef>> {
		let mut query = DriveQuery::folder(folder);
		let mut images = Vec::new();
		loop {
			let page = self.settle(self.gateway.list_images(&self.token, &query).await).await?;
			images.extend(page.files.into_iter().map(ImageRef::from));
			match page.next_page_token {
				Some(token) if !token.is_empty() && query.page_token.as_ref() != Some(&token) => query.page_token = Some(token),
				_ => break,
			}
		}
		Ok(images)
	}
}

fn query(page: &PageArgs) -> DriveQuery {
	DriveQuery {
		folder_id: Some(page.folder.clone()),
		page_token: page.page_token.clone(),
		page_size: page.page_size,
	}
}

pub async fn folders(ctx: &CommandContext, page: &PageArgs) -> Result<CommandOutput> {
	let drive = Drive::connect(ctx).await?;
	let folders = drive.settle(drive.gateway.list_folders(&drive.token, &query(page)).await).await?;
	CommandOutput::new(folders)
}

pub async fn images(ctx: &CommandContext, page: &PageArgs) -> Result<CommandOutput> {
	let drive = Drive::connect(ctx).await?;
	let listing = drive.settle(drive.gateway.list_images(&drive.token, &query(page)).await).await?;
	CommandOutput::new(listing)
}

pub async fn docs(ctx: &CommandContext, page: &PageArgs) -> Result<CommandOutput> {
	let drive = Drive::connect(ctx).await?;
	let listing = drive.settle(drive.gateway.list_docs(&drive.token, &query(page)).await).await?;
	CommandOutput::new(listing)
}

pub async fn doc(ctx: &CommandContext, id: &str) -> Result<CommandOutput> {
	let drive = Drive::connect(ctx).await?;
	let content = drive.doc_text(id).await?;
	CommandOutput::new(json!({ "id": id, "content": content }))
}
