//! Organizations and their membership roles (spec §3 "Namespace").

use crate::{Db, DbError, OrgMemberRow, OrganizationRow, Result};
use kohakuhub_types::NamespaceRole;

impl Db {
    pub async fn create_organization(
        &self,
        name: &str,
        display_name: &str,
        created_by: i64,
    ) -> Result<OrganizationRow> {
        let mut tx = self.pool.begin().await?;
        let org = sqlx::query_as::<_, OrganizationRow>(
            "INSERT INTO organizations (name, display_name, created_by) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(display_name)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from_insert(e, name))?;

        sqlx::query(
            "INSERT INTO org_members (organization_id, user_id, role, added_by) VALUES ($1, $2, $3, $2)",
        )
        .bind(org.id)
        .bind(created_by)
        .bind(NamespaceRole::SuperAdmin.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(org)
    }

    pub async fn get_organization_by_name(&self, name: &str) -> Result<Option<OrganizationRow>> {
        sqlx::query_as::<_, OrganizationRow>("SELECT * FROM organizations WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    pub async fn delete_organization(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_org_members(&self, organization_id: i64) -> Result<Vec<OrgMemberRow>> {
        sqlx::query_as::<_, OrgMemberRow>(
            "SELECT * FROM org_members WHERE organization_id = $1 ORDER BY added_at",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// A user's role within `namespace`, if they are a member of the
    /// organization by that name. `None` both when the namespace is not
    /// an organization and when the user isn't a member of it.
    pub async fn role_in_namespace(&self, user_id: i64, namespace: &str) -> Result<Option<NamespaceRole>> {
        let Some(org) = self.get_organization_by_name(namespace).await? else {
            return Ok(None);
        };
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT role FROM org_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(org.id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(r,)| NamespaceRole::from_str(&r)))
    }

    pub async fn add_org_member(
        &self,
        organization_id: i64,
        user_id: i64,
        role: NamespaceRole,
        added_by: i64,
    ) -> Result<OrgMemberRow> {
        sqlx::query_as::<_, OrgMemberRow>(
            r#"
            INSERT INTO org_members (organization_id, user_id, role, added_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (organization_id, user_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role.to_string())
        .bind(added_by)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    pub async fn remove_org_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        let members = self.list_org_members(organization_id).await?;
        let super_admins = members
            .iter()
            .filter(|m| m.role == NamespaceRole::SuperAdmin.to_string())
            .count();
        let is_last_super_admin = super_admins == 1
            && members
                .iter()
                .any(|m| m.user_id == user_id && m.role == NamespaceRole::SuperAdmin.to_string());
        if is_last_super_admin {
            return Err(DbError::InvalidOperation("cannot remove last super-admin".into()));
        }
        sqlx::query("DELETE FROM org_members WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
