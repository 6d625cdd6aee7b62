#![allow(dead_code)]

pub const SEARCH_OK_COMPUTER: &str =
    "https://www.albumoftheyear.org/search/albums/?q=radiohead%20ok%20computer";
pub const ALBUM_OK_COMPUTER: &str = "https://www.albumoftheyear.org/album/1-radiohead-ok-computer.php";
pub const SIMILAR_OK_COMPUTER: &str =
    "https://www.albumoftheyear.org/album/1-radiohead-ok-computer.php/similar/";
pub const ALBUM_KID_A: &str = "https://www.albumoftheyear.org/album/3-radiohead-kid-a.php";
pub const ALBUM_DUMMY: &str = "https://www.albumoftheyear.org/album/4-portishead-dummy.php";
pub const ALBUM_URBAN_HYMNS: &str = "https://www.albumoftheyear.org/album/5-the-verve-urban-hymns.php";
pub const USER_PROFILE: &str = "https://www.albumoftheyear.org/user/evrynoiseatonce/";
pub const USER_MISSING: &str = "https://www.albumoftheyear.org/user/nonexistent/";

pub const SEARCH_OK_COMPUTER_HTML: &str = include_str!("../fixtures/search_ok_computer.html");
pub const ALBUM_OK_COMPUTER_HTML: &str = include_str!("../fixtures/album_ok_computer.html");
pub const SIMILAR_OK_COMPUTER_HTML: &str = include_str!("../fixtures/similar_ok_computer.html");
pub const ALBUM_KID_A_HTML: &str = include_str!("../fixtures/album_kid_a.html");
pub const ALBUM_DUMMY_HTML: &str = include_str!("../fixtures/album_dummy.html");
pub const USER_PROFILE_HTML: &str = include_str!("../fixtures/user_profile.html");
pub const USER_MISSING_HTML: &str = include_str!("../fixtures/user_missing.html");
