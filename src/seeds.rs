/// Default seed URLs used when none are supplied at startup.
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://news.ycombinator.com/",
    "https://www.startups-list.com/",
    "https://www.indiehackers.com/",
    "https://www.cisco.com/",
    "https://thoughtmachine.net/",
    "https://www.bbc.co.uk/",
    "https://www.bbc.co.uk/news",
    "https://www.kent.ac.uk/",
    "https://home.cern/",
    "https://www.nasa.gov/",
    "https://www.engadget.com/",
    "https://moz.com/top500",
    "https://www.wired.co.uk/",
    "https://www.macrumors.com/",
    "https://en.wikipedia.org/wiki/Six_Degrees_of_Kevin_Bacon",
    "https://www.nhm.ac.uk/",
    "https://www.sciencemuseum.org.uk/",
    "http://info.cern.ch/hypertext/WWW/TheProject.html",
    "https://www.nytimes.com/",
    "https://www.si.edu/",
];
