use std::io::stdin;

use stress_quiz::{Error, Session, CATALOG};

fn main() -> Result<(), Error> {
    env_logger::init();

    let mut buffer = String::new();
    let mut session = Session::new(&CATALOG);

    for index in 0..CATALOG.len() {
        let view = session.current_view();
        println!("Question {} of {}", view.index + 1, view.total);
        println!("{}", view.prompt);
        for option in view.options {
            println!("  {} => {} ({})", option.value, option.label, option.description);
        }
        loop {
            buffer.clear();
            stdin().read_line(&mut buffer)?;
            let accepted = match buffer.trim().parse::<u8>() {
                Ok(value) => session.select(value).is_ok(),
                Err(_) => false,
            };
            if accepted {
                break;
            }
            println!("Please answer with a number between 0 and 3.");
        }
        println!();
        if index + 1 < CATALOG.len() {
            session.next()?;
        }
    }

    let progress = session.progress();
    println!("{}/{} answered", progress.answered, progress.total);

    loop {
        println!("Enter your email to see your result:");
        buffer.clear();
        stdin().read_line(&mut buffer)?;
        match session.finalize(buffer.trim()) {
            Ok(outcome) => {
                println!();
                println!("Score: {}/{}", outcome.score, outcome.max);
                println!("Level: {}", outcome.level);
                println!("{}", outcome.summary);
                println!("{}", outcome.next_step);
                break;
            }
            Err(Error::InvalidEmail) => println!("{}", Error::InvalidEmail),
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
