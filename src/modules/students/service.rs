use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::CurrentUser;
use crate::middleware::request_meta::RequestMeta;
use crate::modules::audit::model::AuditAction;
use crate::modules::audit::service::AuditService;
use crate::modules::students::model::{
    CreateStudentDto, CreatedBySummary, DepartmentCount, GpaDistribution, RecentStudent, Student,
    StudentDetail, StudentFilterParams, StudentStatistics, StudentStatus, StatusCounts,
    UpdateStudentDto, YearCount,
};
use crate::utils::errors::AppError;

const STUDENT_COLUMNS: &str = "id, student_id, first_name, last_name, email, phone, \
     date_of_birth, gender, address, department, program, year, semester, enrollment_date, \
     gpa, status, created_by_id, created_at, updated_at";

/// Appends the WHERE clause shared by the list and count queries.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &StudentFilterParams) {
    let mut prefix = " WHERE ";

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(prefix)
            .push("(first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR student_id ILIKE ")
            .push_bind(pattern)
            .push(")");
        prefix = " AND ";
    }

    if let Some(status) = params.status {
        qb.push(prefix).push("status = ").push_bind(status);
        prefix = " AND ";
    }

    if let Some(program) = params.program.as_deref().filter(|s| !s.is_empty()) {
        qb.push(prefix).push("program = ").push_bind(program.to_string());
    }
}

pub struct StudentService;

impl StudentService {
    /// Lists students matching the filters, with a total count for
    /// pagination. The sort column comes from the closed [`SortField`] enum.
    ///
    /// [`SortField`]: crate::modules::students::model::SortField
    #[instrument(skip(db, params))]
    pub async fn list(
        db: &PgPool,
        params: &StudentFilterParams,
    ) -> Result<(Vec<Student>, i64), AppError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students");
        push_filters(&mut count_query, params);
        let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {STUDENT_COLUMNS} FROM students"
        ));
        push_filters(&mut query, params);
        query
            .push(" ORDER BY ")
            .push(params.sort_by.column())
            .push(" ")
            .push(params.sort_order.as_sql())
            .push(" LIMIT ")
            .push_bind(params.pagination.limit())
            .push(" OFFSET ")
            .push_bind(params.pagination.offset());

        let students = query.build_query_as::<Student>().fetch_all(db).await?;

        Ok((students, total))
    }

    #[instrument(skip(db))]
    pub async fn get_student(db: &PgPool, id: Uuid) -> Result<StudentDetail, AppError> {
        let student = Self::fetch_student(db, id).await?;
        Self::with_creator(db, student).await
    }

    /// Creates a student. Any authenticated user may do this; the caller
    /// becomes the record's creator.
    #[instrument(skip(db, dto, actor, meta))]
    pub async fn create_student(
        db: &PgPool,
        dto: CreateStudentDto,
        actor: &CurrentUser,
        meta: &RequestMeta,
    ) -> Result<StudentDetail, AppError> {
        // Checked independently so the response names the conflicting field.
        let student_id_taken =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE student_id = $1")
                .bind(&dto.student_id)
                .fetch_optional(db)
                .await?;
        if student_id_taken.is_some() {
            return Err(AppError::conflict("Student ID already exists"));
        }

        let email_taken =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE email = $1")
                .bind(&dto.email)
                .fetch_optional(db)
                .await?;
        if email_taken.is_some() {
            return Err(AppError::conflict("Email already exists"));
        }

        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (student_id, first_name, last_name, email, phone,
                 date_of_birth, gender, address, department, program, year, semester,
                 enrollment_date, gpa, status, created_by_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                 COALESCE($13, CURRENT_DATE), $14, $15, $16)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&dto.student_id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(dto.date_of_birth)
        .bind(dto.gender)
        .bind(&dto.address)
        .bind(&dto.department)
        .bind(&dto.program)
        .bind(dto.year)
        .bind(dto.semester)
        .bind(dto.enrollment_date)
        .bind(dto.gpa)
        .bind(dto.status)
        .bind(actor.id)
        .fetch_one(db)
        .await
        .map_err(map_student_unique_violation)?;

        AuditService::record(
            db,
            AuditAction::CreateStudent,
            Some(actor.id),
            meta,
            format!(
                "Created student: {} {} ({})",
                student.first_name, student.last_name, student.student_id
            ),
        )
        .await?;

        Self::with_creator(db, student).await
    }

    /// Partial update. Uniqueness is re-checked only when the patched value
    /// differs from the stored one, so a record never conflicts with itself.
    #[instrument(skip(db, dto, actor, meta))]
    pub async fn update_student(
        db: &PgPool,
        id: Uuid,
        dto: UpdateStudentDto,
        actor: &CurrentUser,
        meta: &RequestMeta,
    ) -> Result<StudentDetail, AppError> {
        let existing = Self::fetch_student(db, id).await?;

        if let Some(student_id) = &dto.student_id {
            if *student_id != existing.student_id {
                let taken = sqlx::query_scalar::<_, Uuid>(
                    "SELECT id FROM students WHERE student_id = $1",
                )
                .bind(student_id)
                .fetch_optional(db)
                .await?;
                if taken.is_some() {
                    return Err(AppError::conflict("Student ID already exists"));
                }
            }
        }

        if let Some(email) = &dto.email {
            if *email != existing.email {
                let taken =
                    sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE email = $1")
                        .bind(email)
                        .fetch_optional(db)
                        .await?;
                if taken.is_some() {
                    return Err(AppError::conflict("Email already exists"));
                }
            }
        }

        let student_id = dto.student_id.unwrap_or(existing.student_id);
        let first_name = dto.first_name.unwrap_or(existing.first_name);
        let last_name = dto.last_name.unwrap_or(existing.last_name);
        let email = dto.email.unwrap_or(existing.email);
        let phone = dto.phone.or(existing.phone);
        let date_of_birth = dto.date_of_birth.or(existing.date_of_birth);
        let gender = dto.gender.unwrap_or(existing.gender);
        let address = dto.address.or(existing.address);
        let department = dto.department.unwrap_or(existing.department);
        let program = dto.program.unwrap_or(existing.program);
        let year = dto.year.unwrap_or(existing.year);
        let semester = dto.semester.unwrap_or(existing.semester);
        let enrollment_date = dto.enrollment_date.unwrap_or(existing.enrollment_date);
        let gpa = dto.gpa.or(existing.gpa);
        let status = dto.status.unwrap_or(existing.status);

        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students
             SET student_id = $1, first_name = $2, last_name = $3, email = $4, phone = $5,
                 date_of_birth = $6, gender = $7, address = $8, department = $9,
                 program = $10, year = $11, semester = $12, enrollment_date = $13,
                 gpa = $14, status = $15, updated_at = NOW()
             WHERE id = $16
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&student_id)
        .bind(&first_name)
        .bind(&last_name)
        .bind(&email)
        .bind(&phone)
        .bind(date_of_birth)
        .bind(gender)
        .bind(&address)
        .bind(&department)
        .bind(&program)
        .bind(year)
        .bind(semester)
        .bind(enrollment_date)
        .bind(gpa)
        .bind(status)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(map_student_unique_violation)?;

        AuditService::record(
            db,
            AuditAction::UpdateStudent,
            Some(actor.id),
            meta,
            format!(
                "Updated student: {} {} ({})",
                student.first_name, student.last_name, student.student_id
            ),
        )
        .await?;

        Self::with_creator(db, student).await
    }

    /// Deletes a student. Deletion is the only admin-gated student
    /// operation.
    #[instrument(skip(db, actor, meta))]
    pub async fn delete_student(
        db: &PgPool,
        id: Uuid,
        actor: &CurrentUser,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }

        let existing = Self::fetch_student(db, id).await?;

        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        AuditService::record(
            db,
            AuditAction::DeleteStudent,
            Some(actor.id),
            meta,
            format!(
                "Deleted student: {} {} ({})",
                existing.first_name, existing.last_name, existing.student_id
            ),
        )
        .await?;

        Ok(())
    }

    /// Read-only aggregates over the students table. Each figure is computed
    /// by its own query against the same snapshot semantics the gateway
    /// provides.
    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<StudentStatistics, AppError> {
        let total = Self::count_where(db, "SELECT COUNT(*) FROM students").await?;

        let by_status = StatusCounts {
            active: Self::count_by_status(db, StudentStatus::Active).await?,
            graduated: Self::count_by_status(db, StudentStatus::Graduated).await?,
            suspended: Self::count_by_status(db, StudentStatus::Suspended).await?,
            withdrawn: Self::count_by_status(db, StudentStatus::Withdrawn).await?,
        };

        // grouped on program, labeled department (dashboard compatibility)
        let by_department = sqlx::query_as::<_, DepartmentCount>(
            "SELECT program AS department, COUNT(*) AS count
             FROM students GROUP BY program ORDER BY program",
        )
        .fetch_all(db)
        .await?;

        let by_year = sqlx::query_as::<_, YearCount>(
            "SELECT year, COUNT(*) AS count FROM students GROUP BY year ORDER BY year",
        )
        .fetch_all(db)
        .await?;

        let recent_students = sqlx::query_as::<_, RecentStudent>(
            "SELECT id, student_id, first_name, last_name, email, program,
                    program AS department, status, created_at
             FROM students ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(db)
        .await?;

        let average_gpa =
            sqlx::query_scalar::<_, Option<f64>>("SELECT AVG(gpa) FROM students WHERE gpa IS NOT NULL")
                .fetch_one(db)
                .await?
                .map(|avg| (avg * 100.0).round() / 100.0);

        let gpa_distribution = GpaDistribution {
            excellent: Self::count_where(db, "SELECT COUNT(*) FROM students WHERE gpa >= 3.5")
                .await?,
            good: Self::count_where(
                db,
                "SELECT COUNT(*) FROM students WHERE gpa >= 3.0 AND gpa < 3.5",
            )
            .await?,
            average: Self::count_where(
                db,
                "SELECT COUNT(*) FROM students WHERE gpa >= 2.5 AND gpa < 3.0",
            )
            .await?,
            below_average: Self::count_where(db, "SELECT COUNT(*) FROM students WHERE gpa < 2.5")
                .await?,
        };

        Ok(StudentStatistics {
            total,
            by_status,
            by_department,
            by_year,
            recent_students,
            average_gpa,
            gpa_distribution,
        })
    }

    async fn fetch_student(db: &PgPool, id: Uuid) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))
    }

    async fn with_creator(db: &PgPool, student: Student) -> Result<StudentDetail, AppError> {
        let created_by = match student.created_by_id {
            Some(creator_id) => {
                sqlx::query_as::<_, CreatedBySummary>(
                    "SELECT id, first_name, last_name, email FROM users WHERE id = $1",
                )
                .bind(creator_id)
                .fetch_optional(db)
                .await?
            }
            None => None,
        };

        Ok(StudentDetail {
            student,
            created_by,
        })
    }

    async fn count_by_status(db: &PgPool, status: StudentStatus) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE status = $1")
                .bind(status)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    async fn count_where(db: &PgPool, sql: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(sql).fetch_one(db).await?;
        Ok(count)
    }
}

/// The pre-checks race with concurrent writers; the database unique
/// constraints stay authoritative, and their violations map to the same
/// conflict the pre-check would have reported.
fn map_student_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("students_student_id_key") => {
                    AppError::conflict("Student ID already exists")
                }
                Some("students_email_key") => AppError::conflict("Email already exists"),
                _ => AppError::conflict("Student already exists"),
            };
        }
    }
    AppError::internal(e)
}
