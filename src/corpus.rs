//! Static HR corpora loaded by the seeder.

#[derive(Debug, Clone, Copy)]
pub struct GlossaryTerm {
    pub id: u64,
    pub original_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub synonyms: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct SqlExample {
    pub id: u64,
    pub original_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub dtype: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogTable {
    pub table: &'static str,
    pub description: &'static str,
    pub columns: &'static [Column],
}

const fn col(name: &'static str, dtype: &'static str, description: &'static str) -> Column {
    Column {
        name,
        dtype,
        description,
    }
}

pub const GLOSSARY: &[GlossaryTerm] = &[
    GlossaryTerm {
        id: 1,
        original_id: "g-emp",
        title: "사번",
        description: "사원 고유키",
        synonyms: &["사번", "직원ID", "employee id", "uid"],
    },
    GlossaryTerm {
        id: 2,
        original_id: "g-hq",
        title: "본사",
        description: "직원의 근무지가 서울 본사인 경우",
        synonyms: &["본사", "서울본사", "HQ"],
    },
    GlossaryTerm {
        id: 3,
        original_id: "g-new",
        title: "신입",
        description: "입사 1년 미만",
        synonyms: &["신입", "입사 1년 미만", "new hire"],
    },
    GlossaryTerm {
        id: 4,
        original_id: "g-active",
        title: "재직자",
        description: "현재 재직 중인 직원",
        synonyms: &["재직자", "현직자", "active employee", "현재 직원"],
    },
    GlossaryTerm {
        id: 5,
        original_id: "g-dept",
        title: "부서",
        description: "직원이 소속된 조직 단위",
        synonyms: &["부서", "팀", "department", "team"],
    },
    GlossaryTerm {
        id: 6,
        original_id: "g-title",
        title: "직급",
        description: "직원의 직위나 계급",
        synonyms: &["직급", "직위", "title", "position", "rank"],
    },
    GlossaryTerm {
        id: 7,
        original_id: "g-attendance",
        title: "근태",
        description: "출근, 결근, 지각 등의 근무 상태",
        synonyms: &["근태", "출석", "attendance", "근무상태"],
    },
    GlossaryTerm {
        id: 8,
        original_id: "g-salary",
        title: "연봉",
        description: "직원의 연간 급여 금액",
        synonyms: &["연봉", "급여", "salary", "연봉금액"],
    },
];

pub const SQL_HISTORY: &[SqlExample] = &[
    SqlExample {
        id: 101,
        original_id: "h-001",
        title: "부서별 인원",
        description: "현재 재직자만 집계",
        sql: "SELECT d.dept_name, count() AS headcount
FROM employees e JOIN departments d ON e.dept_id=d.dept_id
WHERE e.employment_status='ACTIVE'
GROUP BY d.dept_name
ORDER BY headcount DESC;",
    },
    SqlExample {
        id: 102,
        original_id: "h-002",
        title: "결근 3회 이상(지난달)",
        description: "attendance 기반",
        sql: "WITH last_month AS (SELECT toStartOfMonth(addMonths(today(), -1)) AS m)
SELECT e.emp_id, e.name, countIf(a.status='ABSENT') AS absences
FROM attendance a JOIN employees e ON e.emp_id=a.emp_id
CROSS JOIN last_month
WHERE a.att_date >= m AND a.att_date < addMonths(m,1)
GROUP BY e.emp_id, e.name HAVING absences>=3
ORDER BY absences DESC;",
    },
    SqlExample {
        id: 103,
        original_id: "h-003",
        title: "본사 직원 목록",
        description: "서울 본사에 근무하는 재직자 목록",
        sql: "SELECT e.emp_id, e.name, e.title, d.dept_name, e.hire_date
FROM employees e
JOIN departments d ON e.dept_id = d.dept_id
WHERE e.location = 'Seoul-HQ' AND e.employment_status = 'ACTIVE'
ORDER BY e.name;",
    },
    SqlExample {
        id: 104,
        original_id: "h-004",
        title: "직급별 평균 연봉",
        description: "직급별로 그룹화하여 평균 연봉 계산",
        sql: "SELECT title,
       count() AS headcount,
       avg(salary) AS avg_salary,
       min(salary) AS min_salary,
       max(salary) AS max_salary
FROM employees
WHERE employment_status = 'ACTIVE'
GROUP BY title
ORDER BY avg_salary DESC;",
    },
    SqlExample {
        id: 105,
        original_id: "h-005",
        title: "입사 연도별 인원",
        description: "입사 연도별로 직원 수 집계",
        sql: "SELECT toYear(hire_date) AS hire_year,
       count() AS headcount
FROM employees
WHERE employment_status = 'ACTIVE'
GROUP BY hire_year
ORDER BY hire_year DESC;",
    },
    SqlExample {
        id: 106,
        original_id: "h-006",
        title: "지각 횟수 조회(이번 달)",
        description: "이번 달 지각한 직원과 지각 횟수",
        sql: "WITH this_month AS (SELECT toStartOfMonth(today()) AS m)
SELECT e.emp_id, e.name, d.dept_name, countIf(a.status='LATE') AS late_count
FROM attendance a
JOIN employees e ON e.emp_id = a.emp_id
JOIN departments d ON e.dept_id = d.dept_id
CROSS JOIN this_month
WHERE a.att_date >= m AND a.att_date < addMonths(m, 1)
  AND e.employment_status = 'ACTIVE'
GROUP BY e.emp_id, e.name, d.dept_name
HAVING late_count > 0
ORDER BY late_count DESC;",
    },
    SqlExample {
        id: 107,
        original_id: "h-007",
        title: "부서별 평균 연봉",
        description: "부서별 평균 연봉과 인원수 집계",
        sql: "SELECT d.dept_name,
       count() AS headcount,
       avg(e.salary) AS avg_salary,
       sum(e.salary) AS total_salary
FROM employees e
JOIN departments d ON e.dept_id = d.dept_id
WHERE e.employment_status = 'ACTIVE'
GROUP BY d.dept_name
ORDER BY avg_salary DESC;",
    },
];

pub const CATALOG: &[CatalogTable] = &[
    CatalogTable {
        table: "employees",
        description: "직원 마스터",
        columns: &[
            col("emp_id", "UInt64", "사번"),
            col("name", "String", "이름"),
            col("title", "String", "직급"),
            col("dept_id", "UInt32", "부서키"),
            col("location", "String", "근무지(Seoul-HQ 등)"),
            col("hire_date", "Date", "입사일"),
            col("employment_status", "Enum('ACTIVE','LEFT')", "재직/퇴사"),
            col("salary", "UInt32", "연봉(만원)"),
        ],
    },
    CatalogTable {
        table: "departments",
        description: "부서 테이블",
        columns: &[
            col("dept_id", "UInt32", "부서키"),
            col("dept_name", "String", "부서명"),
        ],
    },
    CatalogTable {
        table: "attendance",
        description: "근태 기록",
        columns: &[
            col("att_date", "Date", "근태일자"),
            col("emp_id", "UInt64", "사번"),
            col("status", "Enum('PRESENT','ABSENT','LATE')", "근태상태"),
        ],
    },
    CatalogTable {
        table: "leave_records",
        description: "휴가 기록",
        columns: &[
            col("leave_id", "UInt64", "휴가ID"),
            col("emp_id", "UInt64", "사번"),
            col("leave_start", "Date", "휴가 시작일"),
            col("leave_end", "Date", "휴가 종료일"),
            col(
                "leave_type",
                "Enum('ANNUAL','SICK','MISC')",
                "휴가 유형(연차/병가/기타)",
            ),
            col("days", "UInt8", "휴가 일수"),
            col(
                "status",
                "Enum('PENDING','APPROVED','REJECTED')",
                "승인 상태",
            ),
        ],
    },
    CatalogTable {
        table: "performance_reviews",
        description: "성과평가",
        columns: &[
            col("review_id", "UInt64", "평가ID"),
            col("emp_id", "UInt64", "사번"),
            col("review_date", "Date", "평가일자"),
            col("reviewer_id", "UInt64", "평가자 사번"),
            col("score", "UInt8", "평가 점수(1-100)"),
            col("comments", "String", "평가 의견"),
        ],
    },
    CatalogTable {
        table: "salary_history",
        description: "급여 이력",
        columns: &[
            col("salary_id", "UInt64", "급여ID"),
            col("emp_id", "UInt64", "사번"),
            col("effective_date", "Date", "적용일자"),
            col("salary", "UInt32", "연봉(만원)"),
            col("change_reason", "String", "변경 사유"),
        ],
    },
    CatalogTable {
        table: "projects",
        description: "프로젝트",
        columns: &[
            col("project_id", "UInt64", "프로젝트ID"),
            col("project_name", "String", "프로젝트명"),
            col("start_date", "Date", "시작일"),
            col("end_date", "Date", "종료일"),
            col(
                "status",
                "Enum('PLANNING','ONGOING','COMPLETED','CANCELLED')",
                "프로젝트 상태",
            ),
            col("dept_id", "UInt32", "담당 부서키"),
        ],
    },
    CatalogTable {
        table: "project_assignments",
        description: "프로젝트 배정",
        columns: &[
            col("assignment_id", "UInt64", "배정ID"),
            col("project_id", "UInt64", "프로젝트ID"),
            col("emp_id", "UInt64", "사번"),
            col("role", "String", "역할"),
            col("assign_date", "Date", "배정일자"),
            col("hours_per_week", "UInt8", "주당 투입시간"),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_corpus_sizes() {
        assert_eq!(GLOSSARY.len(), 8);
        assert_eq!(SQL_HISTORY.len(), 7);
        assert_eq!(CATALOG.len(), 8);
    }

    #[test]
    fn test_ids_are_unique() {
        let glossary: HashSet<u64> = GLOSSARY.iter().map(|g| g.id).collect();
        assert_eq!(glossary.len(), GLOSSARY.len());
        let sql: HashSet<u64> = SQL_HISTORY.iter().map(|h| h.id).collect();
        assert_eq!(sql.len(), SQL_HISTORY.len());
    }

    #[test]
    fn test_every_table_has_columns() {
        assert!(CATALOG.iter().all(|t| !t.columns.is_empty()));
    }
}
