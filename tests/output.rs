use weekboard::model::{CreateTask, Day, TaskId};
use weekboard::output::{format_human, task_line, HumanOutput};

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("week w1");
    human.push_summary("tasks", "2");
    human.push_detail("[day 1]   1000  t1  Plan sprint");
    human.push_warning("sync failed");
    human.push_next_step("weekboard tasks --week w1");

    let rendered = format_human(&human);
    assert!(rendered.contains("week w1"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- tasks: 2"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("- sync failed"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- weekboard tasks --week w1"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("archive");
    assert_eq!(format_human(&human), "archive");
}

#[test]
fn task_line_shows_column_and_duration() {
    let date = "2024-03-05T00:00:00Z".parse().expect("date");
    let day = Day::new(2).expect("day");
    let mut task = CreateTask::new("Review", day, date).to_task(TaskId::from("t7"), date);
    task.position = 2000;
    task.duration = Some(45);
    assert_eq!(task_line(&task), "[day 2]   2000  t7  Review (45m)");

    task.archived = true;
    assert!(task_line(&task).starts_with("[archive]"));
}
