use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "shop_type_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShopTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShopTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShopTypes::Name).string().not_null())
                    .col(ColumnDef::new(ShopTypes::Icon).string().not_null())
                    .col(ColumnDef::new(ShopTypes::Sort).integer().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ShopTypes::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum ShopTypes {
    Table,
    Id,
    Name,
    Icon,
    Sort,
}
