use crate::Id;
use serde::{Deserialize, Serialize};

/// A resource addressed by a backend [`Id`].
pub trait Resource {
    fn id(&self) -> Id;
}

/// A resource that belongs to exactly one franchise location.
pub trait LocationScoped: Resource {
    fn location_id(&self) -> Id;
}

/// A franchise location (restaurant, kiosk, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub id: Id,
    pub location: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Display position within the location's menu, ascending.
    #[serde(default)]
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Id,
    pub location: Id,
    pub category: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal price as rendered by the backend, e.g. `"12.50"`.
    pub price: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Manager,
    Cashier,
    Cook,
    Server,
    Driver,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Id,
    pub location: Id,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: StaffRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Returns whether no further status transitions are expected.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item: Id,
    pub quantity: u32,
    pub unit_price: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,
    pub location: Id,
    pub status: OrderStatus,
    pub total: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

/// Request body for `PATCH` on a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Customer feedback left for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Id,
    pub location: Id,
    /// Rating between 1 and 5.
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_true() -> bool {
    true
}

macro_rules! impl_resource {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Resource for $ty {
                fn id(&self) -> Id {
                    self.id
                }
            }
        )+
    };
}

macro_rules! impl_location_scoped {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl LocationScoped for $ty {
                fn location_id(&self) -> Id {
                    self.location
                }
            }
        )+
    };
}

impl_resource!(Location, MenuCategory, MenuItem, StaffMember, Order, Feedback);
impl_location_scoped!(MenuCategory, MenuItem, StaffMember, Order, Feedback);
