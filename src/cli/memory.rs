//! `nova memory ...`: direct access to the long-term memory endpoints.

use std::error::Error;
use std::io;

use serde_json::Map;

use crate::api::{ApiError, MemorySearchRequest, NovaApi, StoreMemoryRequest};
use crate::cli::{Context, MemoryCommands};
use crate::ui::render::write_memories;

pub async fn run(context: &Context, command: MemoryCommands) -> Result<(), Box<dyn Error>> {
    context.require_login()?;
    let api = context.api();
    run_with(api.as_ref(), command)
        .await
        .map_err(|err| match err.downcast::<ApiError>() {
            Ok(api_err) => context.api_failure(*api_err),
            Err(other) => other,
        })
}

async fn run_with(api: &dyn NovaApi, command: MemoryCommands) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout().lock();
    match command {
        MemoryCommands::Recent { limit, memory_type } => {
            let memories = api.recent_memories(limit, memory_type.as_deref()).await?;
            write_memories(&mut out, &memories)?;
        }
        MemoryCommands::Search {
            query,
            limit,
            memory_type,
        } => {
            let request = MemorySearchRequest {
                query: query.join(" "),
                limit,
                memory_type,
            };
            let results = api.search_memories(&request).await?;
            write_memories(&mut out, &results)?;
        }
        MemoryCommands::Store {
            content,
            memory_type,
        } => {
            let content = content.join(" ");
            if content.trim().is_empty() {
                return Err("Nothing to remember".into());
            }
            let request = StoreMemoryRequest {
                content,
                kind: memory_type,
                metadata: Map::new(),
            };
            let stored = api.store_memory(&request).await?;
            println!("✅ Stored memory {}", stored.id);
        }
        MemoryCommands::Delete { id } => {
            api.delete_memory(&id).await?;
            println!("✅ Deleted memory {id}");
        }
        MemoryCommands::Consolidate { days } => {
            let ack = api.consolidate_memories(days).await?;
            if ack.message.is_empty() {
                println!("✅ Consolidated memories from the last {days} days");
            } else {
                println!("✅ {}", ack.message);
            }
        }
    }
    Ok(())
}
