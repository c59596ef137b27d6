pub mod shop;
pub mod shop_type;

pub use shop::Model as Shop;
pub use shop_type::Model as ShopType;
