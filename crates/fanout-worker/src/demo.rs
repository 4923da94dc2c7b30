//! Demo capabilities shipped with the server binary.
//!
//! These are placeholders for the real external capabilities (LLM
//! summarization, actual scraping, market pricing). They honor the reply
//! conventions the aggregation layer knows how to extract: inventory
//! replies are `"<value> <unit>"`, order confirmations carry an
//! `order_id: <id>` line.

use async_trait::async_trait;
use rand::Rng;

use crate::capability::{Capability, CapabilityError};

/// A farm inventory desk answering yield queries with a fixed stock figure.
pub struct FarmInventory {
    region: String,
    yield_lbs: u32,
}

impl FarmInventory {
    pub fn new(region: impl Into<String>, yield_lbs: u32) -> Self {
        Self {
            region: region.into(),
            yield_lbs,
        }
    }
}

#[async_trait]
impl Capability for FarmInventory {
    async fn handle(&self, payload: &str) -> Result<String, CapabilityError> {
        let prompt = payload.to_lowercase();
        if prompt.contains("order") {
            return Err(CapabilityError::UnsupportedRequest(format!(
                "{} farm does not take orders directly",
                self.region
            )));
        }
        Ok(format!("{} lbs", self.yield_lbs))
    }
}

/// An order desk confirming order placement with a generated order id.
pub struct OrderDesk;

#[async_trait]
impl Capability for OrderDesk {
    async fn handle(&self, payload: &str) -> Result<String, CapabilityError> {
        let prompt = payload.to_lowercase();
        if !prompt.contains("order") {
            return Err(CapabilityError::UnsupportedRequest(
                "order desk only handles order requests".to_string(),
            ));
        }
        let order_id: u32 = rand::thread_rng().gen_range(10_000..100_000);
        Ok(format!("Order accepted.\norder_id: {order_id}"))
    }
}

/// A page worker producing a placeholder summary for a `scrape <url>` task.
pub struct PageSummarizer;

#[async_trait]
impl Capability for PageSummarizer {
    async fn handle(&self, payload: &str) -> Result<String, CapabilityError> {
        let url = payload
            .strip_prefix("scrape ")
            .unwrap_or(payload)
            .trim()
            .to_string();
        if url.is_empty() {
            return Err(CapabilityError::UnsupportedRequest(
                "no url in scrape request".to_string(),
            ));
        }
        Ok(format!("Summary of {url}: no notable updates."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_farm_inventory_reply_shape() {
        let farm = FarmInventory::new("colombia", 5000);
        let reply = farm.handle("How much coffee do you have?").await.unwrap();
        assert_eq!(reply, "5000 lbs");
    }

    #[tokio::test]
    async fn test_farm_rejects_orders() {
        let farm = FarmInventory::new("brazil", 800);
        assert!(farm.handle("create order with price 4").await.is_err());
    }

    #[tokio::test]
    async fn test_order_desk_emits_order_id_line() {
        let reply = OrderDesk
            .handle("create order with price 4.25 and quantity 100")
            .await
            .unwrap();
        assert!(reply.lines().any(|l| l.starts_with("order_id: ")));
    }

    #[tokio::test]
    async fn test_page_summarizer() {
        let reply = PageSummarizer
            .handle("scrape https://example.com/news")
            .await
            .unwrap();
        assert!(reply.contains("https://example.com/news"));
    }
}
