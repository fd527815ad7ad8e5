use crate::dto::rrhh_dto::{CreateDepartmentPayload, CreateEmployeePayload};
use crate::error::{Error, Result};
use crate::models::employee::{Department, Employee};
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_CHAIN_DEPTH: usize = 64;

#[derive(Clone)]
pub struct EmployeeService {
    pool: PgPool,
}

/// `chain` is the proposed manager followed by everyone above them.
pub fn ensure_no_manager_cycle(employee_id: Uuid, chain: &[Uuid]) -> Result<()> {
    if chain.contains(&employee_id) {
        return Err(Error::BadRequest(
            "Manager assignment would create a reporting cycle".to_string(),
        ));
    }
    Ok(())
}

impl EmployeeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_department(&self, payload: CreateDepartmentPayload) -> Result<Department> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (name, work_center)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.work_center)
        .fetch_one(&self.pool)
        .await?;
        Ok(department)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let rows = sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(&self, payload: CreateEmployeePayload) -> Result<Employee> {
        if let Some(manager_id) = payload.manager_id {
            self.get(manager_id)
                .await
                .map_err(|_| Error::BadRequest("Manager not found".to_string()))?;
        }

        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (full_name, email, position, department_id, manager_id, hired_on, status)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, CURRENT_DATE), COALESCE($7, 'active'))
            RETURNING *
            "#,
        )
        .bind(payload.full_name.trim())
        .bind(payload.email.trim().to_lowercase())
        .bind(payload.position)
        .bind(payload.department_id)
        .bind(payload.manager_id)
        .bind(payload.hired_on)
        .bind(payload.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(employee)
    }

    pub async fn get(&self, id: Uuid) -> Result<Employee> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        employee.ok_or_else(|| Error::NotFound("Employee not found".to_string()))
    }

    pub async fn list(&self, department_id: Option<Uuid>) -> Result<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>(
            r#"
            SELECT * FROM employees
            WHERE ($1::uuid IS NULL OR department_id = $1)
            ORDER BY full_name
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn direct_reports(&self, manager_id: Uuid) -> Result<Vec<Employee>> {
        let rows = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE manager_id = $1 ORDER BY full_name",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Managers above `id`, nearest first.
    pub async fn management_chain(&self, id: Uuid) -> Result<Vec<Employee>> {
        let start = self.get(id).await?;
        let mut chain = Vec::new();
        let mut next = start.manager_id;
        while let Some(manager_id) = next {
            if chain.len() >= MAX_CHAIN_DEPTH {
                return Err(Error::Internal(format!(
                    "Management chain of {} exceeds {} levels",
                    id, MAX_CHAIN_DEPTH
                )));
            }
            let manager = self.get(manager_id).await?;
            next = manager.manager_id;
            chain.push(manager);
        }
        Ok(chain)
    }

    pub async fn set_manager(&self, id: Uuid, manager_id: Option<Uuid>) -> Result<Employee> {
        self.get(id).await?;

        if let Some(manager_id) = manager_id {
            let mut chain = vec![manager_id];
            chain.extend(
                self.management_chain(manager_id)
                    .await?
                    .into_iter()
                    .map(|e| e.id),
            );
            ensure_no_manager_cycle(id, &chain)?;
        }

        let employee = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees SET manager_id = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(manager_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(employee_id = %id, manager_id = ?manager_id, "Employee manager updated");
        Ok(employee)
    }
}
