mod test_support;

use serde_json::json;
use test_support::{admin, create_student, error_code, open_workspace, request, request_ok, shutdown};

#[test]
fn dashboard_and_performance_views() {
    let (child, mut stdin, mut reader, _ws) = open_workspace("schoold-dashboard");

    let empty = request_ok(&mut stdin, &mut reader, "d0", "dashboard.stats", admin(), json!({}));
    assert_eq!(empty["totalStudents"], 0);
    assert_eq!(empty["averagePerformance"], json!(0.0));

    let a = create_student(&mut stdin, &mut reader, "Asha Rao", "asha@example.com", "9th");
    let b = create_student(&mut stdin, &mut reader, "Bilal Khan", "bilal@example.com", "10th");
    create_student(&mut stdin, &mut reader, "Chen Li", "chen@example.com", "10th");

    request_ok(
        &mut stdin,
        &mut reader,
        "bulk",
        "marks.bulkUpload",
        admin(),
        json!({
            "examName": "Final 2024",
            "examDate": "2024-03-15",
            "examType": "Final",
            "subject": "Math",
            "totalMarks": 3,
            "students": [
                { "studentId": a["id"], "marksObtained": 2 },
                { "studentId": b["id"], "marksObtained": 3 }
            ]
        }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "single",
        "marks.create",
        admin(),
        json!({
            "studentId": a["id"],
            "examName": "UT 4",
            "examDate": "2024-04-02",
            "examType": "Weekly Test",
            "subject": "Science",
            "marksObtained": 17,
            "totalMarks": 20
        }),
    );

    let stats = request_ok(&mut stdin, &mut reader, "d1", "dashboard.stats", admin(), json!({}));
    assert_eq!(stats["totalStudents"], 3);
    assert_eq!(stats["activeStudents"], 3);
    assert_eq!(stats["totalExams"], 2);
    // (66.67 + 100 + 85) / 3 = 83.89
    assert_eq!(stats["averagePerformance"], json!(83.9));
    assert_eq!(
        stats["classWiseCount"],
        json!([{ "class": "10th", "count": 2 }, { "class": "9th", "count": 1 }])
    );
    assert_eq!(stats["recentActivities"].as_array().map(|v| v.len()), Some(3));
    assert_eq!(stats["recentActivities"][0]["examName"], "UT 4");

    let perf = request_ok(&mut stdin, &mut reader, "p1", "analytics.performance", admin(), json!({}));
    assert_eq!(perf["topPerformers"][0]["studentName"], "Bilal Khan");
    assert_eq!(perf["topPerformers"][1]["examCount"], 2);
    assert_eq!(perf["monthlyTrend"].as_array().map(|v| v.len()), Some(2));
    assert_eq!(perf["monthlyTrend"][0]["month"], 3);

    let math = request_ok(
        &mut stdin,
        &mut reader,
        "p2",
        "analytics.performance",
        admin(),
        json!({ "filters": { "subject": "Math", "class": "9th" } }),
    );
    assert_eq!(math["topPerformers"].as_array().map(|v| v.len()), Some(1));
    assert_eq!(math["subjectWiseAnalysis"][0]["avgPercentage"], json!(66.67));

    let bad = request(
        &mut stdin,
        &mut reader,
        "p3",
        "analytics.performance",
        admin(),
        json!({ "filters": { "examType": "Pop Quiz" } }),
    );
    assert_eq!(error_code(&bad), Some("bad_params"));

    shutdown(child, stdin);
}
