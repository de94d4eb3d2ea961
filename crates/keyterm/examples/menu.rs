/// # menu: A Tiny Game Launcher
///
/// This example shows a menu with a disabled entry. Picking "Play" asks for the
/// player's name and then counts clicks of ‹A› and ‹D› until ‹Q› is clicked.
/// Picking "Reaction" gives the player three seconds to type a number. Picking
/// "Quit" exits.
///
/// Set `KEYTERM_LOG` to a file name to capture keyterm's diagnostics, with
/// `RUST_LOG` controlling the level as usual. On Linux, key state requires read
/// access to the devices in `/dev/input`.
use std::io::Write;
use std::time::Duration;

use keyterm::{CleanupStatus, Error, InitStatus, Key, MenuEntry, Rgb, Scan, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Choice {
    Play,
    Reaction,
    Settings,
    Quit,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let Some(path) = std::env::var_os("KEYTERM_LOG") else {
        return;
    };
    match std::fs::File::create(&path) {
        Ok(file) => {
            let _ = fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        Err(error) => eprintln!("cannot log to {:?}: {}", path, error),
    }
}

fn play(session: &mut Session) -> Result<(), Error> {
    write!(session, "Your name? ")?;
    let name = session.read_line(32)?;
    let name = if name.is_empty() { String::from("Anonymous") } else { name };

    session.clear()?;
    session.set_bold(true)?;
    write!(session, "Hello, {}!", name)?;
    session.reset_style()?;
    write!(session, " Click ‹A› and ‹D› as often as you like, ‹Q› to stop.\n")?;

    let (mut left, mut right) = (0_u32, 0_u32);
    loop {
        match session.wait_clicks(&[Key::A, Key::D, Key::Q])? {
            Key::A => left += 1,
            Key::D => right += 1,
            _ => break,
        }
        write!(session, "\r‹A› {:>4}   ‹D› {:>4}", left, right)?;
    }

    write!(session, "\n\nPress ‹⏎› to return to the menu.")?;
    session.wait_click(Key::Enter)?;
    Ok(())
}

fn reaction(session: &mut Session) -> Result<(), Error> {
    session.set_foreground(Rgb(242, 140, 40))?;
    write!(session, "Type a number and ‹⏎› within three seconds: ")?;
    session.reset_style()?;

    let outcome = session.scan(Duration::from_secs(3), |s| s.trim().parse::<i64>())?;
    session.clear()?;
    match outcome {
        Scan::Parsed(Ok(number)) => write!(session, "Got {} in time.\n", number)?,
        Scan::Parsed(Err(_)) => write!(session, "In time, but not a number.\n")?,
        Scan::TimedOut => {
            session.set_dim(true)?;
            write!(session, "Too slow.\n")?;
            session.set_dim(false)?;
        }
    }

    write!(session, "Press ‹⏎› to return to the menu.")?;
    session.wait_click(Key::Enter)?;
    Ok(())
}

fn run(session: &mut Session) -> Result<(), Error> {
    session.set_title("keyterm menu")?;

    let entries = [
        MenuEntry::new("Play", Choice::Play).with_detail("count some clicks"),
        MenuEntry::new("Reaction", Choice::Reaction).with_detail("type fast"),
        MenuEntry::new("Settings", Choice::Settings)
            .with_detail("not yet")
            .disabled(),
        MenuEntry::new("Quit", Choice::Quit).with_detail("back to the shell"),
    ];

    loop {
        match session.menu("keyterm 🎮", &entries)? {
            Some(Choice::Play) => play(session)?,
            Some(Choice::Reaction) => reaction(session)?,
            Some(Choice::Settings) => {}
            Some(Choice::Quit) | None => return Ok(()),
        }
    }
}

fn main() {
    init_tracing();

    let mut session = match Session::open() {
        Ok(session) => session,
        Err(error) => {
            eprintln!("{:?}: {}", InitStatus::from(&error), error);
            std::process::exit(1);
        }
    };

    let result = run(&mut session);
    if session.cleanup() == CleanupStatus::Warning {
        eprintln!("could not restore the terminal; try running `reset`");
    }

    if let Err(error) = result {
        eprintln!("{}", error);
        std::process::exit(1);
    }
    println!("bye bye!");
}
