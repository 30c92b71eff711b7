use crate::cache::OrderCache;
use crate::error::Error;
use crate::request::RequestDescriptor;
use fadmin_protocol::Id;
use fadmin_protocol::http::resources::{Order, OrderStatus, OrderStatusUpdate};
use tracing::instrument;

impl OrderCache {
    /// Cached orders of `location_id` that still need attention.
    pub fn open(&self, location_id: Id) -> Vec<Order> {
        self.get(location_id)
            .unwrap_or_default()
            .into_iter()
            .filter(|order| !order.status.is_final())
            .collect()
    }

    /// Moves an order to `status`.
    ///
    /// The cached order is updated before the request is sent and restored if the backend refuses
    /// the change. On success the backend's representation replaces the cached one.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn update_status(
        &self,
        location_id: Id,
        order_id: Id,
        status: OrderStatus,
    ) -> Result<Order, Error> {
        let previous = self.modify(location_id, order_id, |order| order.status = status);

        let descriptor = RequestDescriptor::patch(self.item_path(location_id, order_id))
            .with_json(&OrderStatusUpdate { status })?;
        let result = match self.api().request(descriptor).await {
            Ok(response) => response.json::<Order>(),
            Err(err) => Err(err),
        };

        match result {
            Ok(order) => {
                self.insert(order.clone());
                Ok(order)
            }
            Err(err) => {
                if let Some(previous) = previous {
                    tracing::debug!(?err, "Status update failed, restoring cached order");
                    self.update(previous);
                }
                Err(err)
            }
        }
    }
}
