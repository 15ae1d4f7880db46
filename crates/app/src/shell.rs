//! Line-oriented terminal front end for a running exam session.

use exam_core::model::{ExamResult, SubmitTrigger};
use services::{QuestionStatus, RunningSession, SessionController, SessionOutcome, SessionView};
use tokio::io::{AsyncBufReadExt, BufReader};

pub const CONFIRM_SUBMIT: &str = "Are you sure you want to submit? [y/N]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Next,
    Previous,
    /// One-based question number as typed.
    Goto(i64),
    /// One-based option number of a multiple-choice question.
    Choose(usize),
    Answer(String),
    Submit,
    Show,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match head {
            "" => Self::Empty,
            "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "g" | "goto" => rest
                .parse()
                .map_or_else(|_| Self::Unknown(line.to_owned()), Self::Goto),
            "o" | "option" => rest
                .parse()
                .map_or_else(|_| Self::Unknown(line.to_owned()), Self::Choose),
            "a" | "answer" if !rest.is_empty() => Self::Answer(rest.to_owned()),
            "s" | "submit" => Self::Submit,
            "v" | "view" => Self::Show,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" => Self::Quit,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  n | next            next question");
    println!("  p | prev            previous question");
    println!("  g | goto <number>   jump to a question");
    println!("  o | option <number> choose an option (multiple choice)");
    println!("  a | answer <text>   type an answer");
    println!("  s | submit          submit the exam");
    println!("  v | view            show the current question again");
    println!("  q | quit            leave without submitting");
}

fn render(view: &SessionView) {
    let clock = if view.is_timed {
        let warning = if view.low_time { "  (hurry up!)" } else { "" };
        format!("time left {}{warning}", view.remaining_label)
    } else {
        "untimed".to_owned()
    };
    println!();
    println!(
        "{}  |  question {} of {}  |  {} answered  |  {clock}",
        view.exam_title, view.position, view.question_count, view.answered_count
    );
    println!("map: {}", render_map(&view.question_map));

    let Some(question) = &view.question else {
        println!("This exam has no questions. Submit to finish.");
        return;
    };
    println!();
    println!("{} ({} marks)", question.text, question.marks);
    for (i, option) in question.options.iter().enumerate() {
        let selected = question.answer.as_deref() == Some(option.as_str());
        let marker = if selected { "*" } else { " " };
        println!(" {marker} {}. {option}", i + 1);
    }
    match (&question.answer, question.is_multiple_choice) {
        (Some(answer), false) => println!("your answer: {answer}"),
        (None, false) => println!("(no answer yet)"),
        _ => {}
    }
}

fn render_map(map: &[QuestionStatus]) -> String {
    map.iter()
        .enumerate()
        .map(|(i, status)| match status {
            QuestionStatus::Current => format!("[{}]", i + 1),
            QuestionStatus::Answered => format!("{}*", i + 1),
            QuestionStatus::Unvisited => format!("{}", i + 1),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_result(result: ExamResult, trigger: Option<SubmitTrigger>) {
    if trigger == Some(SubmitTrigger::TimeExpired) {
        println!();
        println!("Time is up. Your answers were submitted automatically.");
    }
    let verdict = if result.passed { "PASSED" } else { "FAILED" };
    println!();
    println!(
        "Score: {}% ({} / {} marks)  {verdict}",
        result.percent, result.gained_marks, result.total_marks
    );
}

fn choose_option(ctl: &SessionController, number: usize) {
    let option = ctl.with_session(|s| {
        s.current_question()
            .and_then(|q| number.checked_sub(1).and_then(|i| q.options().get(i)))
            .cloned()
    });
    match option {
        Some(option) => {
            if let Err(e) = ctl.answer_current(option) {
                println!("{e}");
            }
        }
        None => println!("no option {number} on this question"),
    }
}

/// Drives `running` from stdin until it is submitted or the learner quits.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub async fn run_session(
    running: RunningSession,
) -> Result<Option<SessionOutcome>, Box<dyn std::error::Error>> {
    let ctl = running.controller().clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirming = false;

    println!("Type `help` for commands.");
    render(&ctl.view());

    loop {
        let line = tokio::select! {
            () = ctl.wait_submitted() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        if confirming {
            confirming = false;
            if matches!(line.trim(), "y" | "Y" | "yes") {
                if let Err(e) = ctl.submit() {
                    println!("{e}");
                }
                break;
            }
            println!("Submission cancelled.");
            continue;
        }

        match ShellCommand::parse(&line) {
            ShellCommand::Next => {
                ctl.next();
            }
            ShellCommand::Previous => {
                ctl.previous();
            }
            ShellCommand::Goto(number) => {
                if !ctl.jump_to(number.saturating_sub(1)) {
                    println!("no question {number}");
                }
            }
            ShellCommand::Choose(number) => choose_option(&ctl, number),
            ShellCommand::Answer(text) => {
                if let Err(e) = ctl.answer_current(text) {
                    println!("{e}");
                }
            }
            ShellCommand::Submit => {
                println!("{CONFIRM_SUBMIT}");
                confirming = true;
                continue;
            }
            ShellCommand::Show | ShellCommand::Empty => {}
            ShellCommand::Help => {
                print_help();
                continue;
            }
            ShellCommand::Quit => break,
            ShellCommand::Unknown(raw) => {
                println!("unknown command: {raw} (type `help`)");
                continue;
            }
        }
        render(&ctl.view());
    }

    if let Some(submission) = ctl.with_session(|s| s.submission()) {
        render_result(submission.result, Some(submission.trigger));
    } else {
        println!("Left without submitting. Nothing was recorded.");
    }

    Ok(running.finish().await)
}
