use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Accounts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(BodyweightEntries)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Token resolution filters on current_token for every authorized
        // request; keep that lookup off a table scan.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_current_token")
                    .table(Accounts)
                    .col(crate::entities::accounts::Column::CurrentToken)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bodyweight_user_id")
                    .table(BodyweightEntries)
                    .col(crate::entities::bodyweight_entries::Column::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BodyweightEntries).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts).to_owned())
            .await?;

        Ok(())
    }
}
