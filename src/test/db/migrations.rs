pub mod shop;
pub mod shop_type;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(shop_type::Migration), Box::new(shop::Migration)]
    }
}
