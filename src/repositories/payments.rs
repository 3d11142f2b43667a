use crate::models::payments::{Order, OrderStatus};

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

mod razorpay;

pub use razorpay::{GatewayOrder, PaymentGateway, SimulatedRazorpay};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,
    #[error("Order belongs to another user")]
    WrongUser,
    #[error("Payment is already being processed")]
    InProgress,
}

/// Result of trying to take an order for settlement.
#[derive(Debug)]
pub enum OrderClaim {
    /// The caller now owns settlement of this order.
    Claimed(Order),
    /// Settlement already ran; the order carries its transaction id.
    Settled(Order),
}

#[derive(Clone, Default)]
pub struct OrderRepository {
    orders: Arc<DashMap<String, Order>>,
}

impl OrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_order(&self, uid: &str, gateway_order: GatewayOrder) -> Order {
        let order = Order {
            id: gateway_order.id,
            uid: uid.to_string(),
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            receipt: gateway_order.receipt,
            status: OrderStatus::Created,
            transaction_id: None,
            created_at: Utc::now(),
        };

        self.orders.insert(order.id.clone(), order.clone());

        order
    }

    /// Moves a `Created` order to `Processing`. Runs under the entry lock so
    /// only one verification of an order can settle it.
    pub fn claim(&self, id: &str, uid: &str) -> Result<OrderClaim, OrderError> {
        let mut order = self.orders.get_mut(id).ok_or(OrderError::NotFound)?;

        if order.uid != uid {
            return Err(OrderError::WrongUser);
        }

        match order.status {
            OrderStatus::Created => {
                order.status = OrderStatus::Processing;
                Ok(OrderClaim::Claimed(order.clone()))
            }
            OrderStatus::Processing => Err(OrderError::InProgress),
            OrderStatus::Paid | OrderStatus::Failed => Ok(OrderClaim::Settled(order.clone())),
        }
    }

    /// Hands a claimed order back so a later verification can retry it.
    pub fn release(&self, id: &str) {
        if let Some(mut order) = self.orders.get_mut(id) {
            if order.status == OrderStatus::Processing {
                order.status = OrderStatus::Created;
            }
        }
    }

    /// Records the settlement result of a claimed order.
    pub fn settle(&self, id: &str, paid: bool, transaction_id: &str) -> Result<Order, OrderError> {
        let mut order = self.orders.get_mut(id).ok_or(OrderError::NotFound)?;

        order.status = if paid {
            OrderStatus::Paid
        } else {
            OrderStatus::Failed
        };
        order.transaction_id = Some(transaction_id.to_string());

        Ok(order.clone())
    }
}

#[cfg(test)]
impl OrderRepository {
    pub fn get_order(&self, id: &str) -> Option<Order> {
        self.orders.get(id).map(|order| order.clone())
    }
}
